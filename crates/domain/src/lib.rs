//! Domain layer for the inventory core.
//!
//! This crate provides the two cooperating domain components:
//! - `stock`: the event-sourced StockItem aggregate, its movement events,
//!   commands, and the StockService entry point
//! - `category`: the category tree with its store abstractions and the
//!   CategoryService entry point
//!
//! plus the Aggregate/DomainEvent traits and the CommandHandler that wires
//! aggregates to the movement ledger.

pub mod aggregate;
pub mod category;
pub mod command;
pub mod error;
pub mod stock;

pub use aggregate::{Aggregate, DomainEvent};
pub use category::{
    Category, CategoryError, CategoryNode, CategoryPatch, CategoryService, CategoryStats,
    CategoryStore, InMemoryCategoryStore, InMemoryProductCatalog, NewCategory, ProductCatalog,
};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use stock::{
    AdjustStock, IssueStock, MoveStock, MovementRef, Money, ReceiveStock, RegisterStock, ReleaseStock,
    ReserveStock, ReturnStock, SetThresholds, StockError, StockEvent, StockItem, StockService,
    TransferStock,
};
