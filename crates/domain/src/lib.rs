//! Domain layer for the event-sourcing system.
//!
//! This crate provides the write-side building blocks:
//! - Aggregate, DomainEvent and Command traits
//! - EventPublisher implementations for synchronous event fan-out
//! - Repositories backed by snapshots or by event replay
//! - ApplicationService driving one command end to end
//! - Runbook (ordered task list) and Tab (drinks and food order) aggregates

pub mod aggregate;
pub mod command;
pub mod error;
pub mod publisher;
pub mod repository;
pub mod runbook;
pub mod service;
pub mod tab;

pub use aggregate::{Aggregate, DomainEvent, EventBuffer};
pub use command::{Command, CommandResult};
pub use error::{DomainError, ValidationError};
pub use publisher::{
    EventPublisher, EventSubscriber, FanOutPublisher, NoopPublisher, RecordingPublisher,
    SubscriberError,
};
pub use repository::{EventSourcedRepository, Repository, SnapshotRepository};
pub use runbook::{
    AddTask, CompleteRunbook, CompleteTask, CreateRunbook, Runbook, RunbookCommand, RunbookError,
    RunbookEvent, RunbookService, RunbookStatus, StartTask, Task, TaskId, TaskStatus, UserId,
};
pub use service::ApplicationService;
pub use tab::{
    CloseTab, ItemCategory, MarkDrinksServed, MarkFoodServed, MenuNumber, Money, OpenTab,
    OrderItem, PlaceOrder, Tab, TabCommand, TabError, TabEvent, TabService,
};
