//! Tab aggregate: a restaurant table's running order of drinks and food.

mod aggregate;
mod commands;
mod events;
mod service;
mod value_objects;

pub use aggregate::Tab;
pub use commands::*;
pub use events::{
    DrinksOrderedData, DrinksServedData, FoodOrderedData, FoodServedData, TabClosedData,
    TabEvent, TabOpenedData,
};
pub use service::TabService;
pub use value_objects::{ItemCategory, MenuNumber, Money, OrderItem};

use thiserror::Error;

/// Errors that can occur during tab operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TabError {
    /// Table number is required.
    #[error("Table number is required")]
    TableNumberRequired,

    /// Waiter is required.
    #[error("Waiter is required")]
    WaiterRequired,

    /// The tab was already opened.
    #[error("Tab is already open")]
    TabAlreadyOpen,

    /// The tab was never opened, or is closed.
    #[error("Tab is not open")]
    TabNotOpen,

    /// An order must contain at least one item.
    #[error("Order has no items")]
    EmptyOrder,

    /// Prices cannot be negative.
    #[error("Item {menu_number} has a negative price")]
    InvalidPrice { menu_number: MenuNumber },

    /// The tab total would no longer fit in a money amount.
    #[error("Order would exceed the largest tab total")]
    OrderTooLarge,

    /// Serving requires at least one menu number.
    #[error("Nothing to serve")]
    NothingToServe,

    /// A drink was marked served that is not waiting to be served.
    #[error("Drink {menu_number} is not outstanding")]
    DrinksNotOutstanding { menu_number: MenuNumber },

    /// A food item was marked served that is not waiting to be served.
    #[error("Food {menu_number} is not outstanding")]
    FoodNotOutstanding { menu_number: MenuNumber },

    /// The tab still has items that were ordered but not served.
    #[error("Cannot close tab with {count} unserved item(s)")]
    UnservedItems { count: usize },

    /// The amount paid does not cover what was served.
    #[error("Must pay at least {owed}, got {paid}")]
    MustPayEnough { owed: Money, paid: Money },

    #[error("Amount paid cannot be negative")]
    InvalidPayment,
}
