pub mod filter;
pub mod project_ops;
pub mod propagate;
pub mod task_ops;
pub mod tree;
