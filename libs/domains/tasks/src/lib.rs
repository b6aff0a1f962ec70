//! Task domain: models, repository seam, events, and the service that ties
//! writes to cache invalidation and event publishing.

pub mod error;
pub mod events;
pub mod memory;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{TaskError, TaskResult};
pub use events::{TaskCreatedEvent, TaskDeletedEvent, TaskEvent, TaskUpdatedEvent};
pub use memory::InMemoryTaskRepository;
pub use models::{
    CreateTask, PageRequest, PaginatedResult, Task, TaskFilter, TaskSort, TaskSortField,
    TaskStatus, UpdateTask,
};
pub use repository::TaskRepository;
pub use service::TaskService;
