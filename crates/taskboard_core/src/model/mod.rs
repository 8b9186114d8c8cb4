mod task;

pub use task::{NewTask, Task, TaskEdit, TaskStatus, ZERO_ELAPSED};
