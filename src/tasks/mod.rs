mod sweeper;

pub use sweeper::SweeperTask;
