//! Tab commands.

use common::AggregateId;

use crate::command::Command;

use super::{MenuNumber, Money, OrderItem};

/// Command to open a tab for a table.
#[derive(Debug, Clone)]
pub struct OpenTab {
    /// The tab ID to open.
    pub tab_id: AggregateId,

    pub table_number: u32,

    /// The waiter serving the table.
    pub waiter: String,
}

impl OpenTab {
    /// Creates a new OpenTab command with a generated tab ID.
    pub fn new(table_number: u32, waiter: impl Into<String>) -> Self {
        Self::with_id(AggregateId::new(), table_number, waiter)
    }

    pub fn with_id(tab_id: AggregateId, table_number: u32, waiter: impl Into<String>) -> Self {
        Self {
            tab_id,
            table_number,
            waiter: waiter.into(),
        }
    }
}

/// Command to order items, mixing drinks and food freely.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub tab_id: AggregateId,
    pub items: Vec<OrderItem>,
}

impl PlaceOrder {
    pub fn new(tab_id: AggregateId, items: Vec<OrderItem>) -> Self {
        Self { tab_id, items }
    }
}

/// Command to mark drinks as served.
#[derive(Debug, Clone)]
pub struct MarkDrinksServed {
    pub tab_id: AggregateId,
    pub menu_numbers: Vec<MenuNumber>,
}

impl MarkDrinksServed {
    pub fn new(tab_id: AggregateId, menu_numbers: Vec<MenuNumber>) -> Self {
        Self {
            tab_id,
            menu_numbers,
        }
    }
}

/// Command to mark food as served.
#[derive(Debug, Clone)]
pub struct MarkFoodServed {
    pub tab_id: AggregateId,
    pub menu_numbers: Vec<MenuNumber>,
}

impl MarkFoodServed {
    pub fn new(tab_id: AggregateId, menu_numbers: Vec<MenuNumber>) -> Self {
        Self {
            tab_id,
            menu_numbers,
        }
    }
}

/// Command to pay and close a tab.
#[derive(Debug, Clone)]
pub struct CloseTab {
    pub tab_id: AggregateId,
    pub amount_paid: Money,
}

impl CloseTab {
    pub fn new(tab_id: AggregateId, amount_paid: Money) -> Self {
        Self {
            tab_id,
            amount_paid,
        }
    }
}

/// Every command a tab accepts.
#[derive(Debug, Clone)]
pub enum TabCommand {
    OpenTab(OpenTab),
    PlaceOrder(PlaceOrder),
    MarkDrinksServed(MarkDrinksServed),
    MarkFoodServed(MarkFoodServed),
    CloseTab(CloseTab),
}

impl Command for TabCommand {
    fn aggregate_id(&self) -> AggregateId {
        match self {
            TabCommand::OpenTab(cmd) => cmd.tab_id,
            TabCommand::PlaceOrder(cmd) => cmd.tab_id,
            TabCommand::MarkDrinksServed(cmd) => cmd.tab_id,
            TabCommand::MarkFoodServed(cmd) => cmd.tab_id,
            TabCommand::CloseTab(cmd) => cmd.tab_id,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TabCommand::OpenTab(_) => "OpenTab",
            TabCommand::PlaceOrder(_) => "PlaceOrder",
            TabCommand::MarkDrinksServed(_) => "MarkDrinksServed",
            TabCommand::MarkFoodServed(_) => "MarkFoodServed",
            TabCommand::CloseTab(_) => "CloseTab",
        }
    }

    fn is_creation(&self) -> bool {
        matches!(self, TabCommand::OpenTab(_))
    }
}

impl From<OpenTab> for TabCommand {
    fn from(cmd: OpenTab) -> Self {
        TabCommand::OpenTab(cmd)
    }
}

impl From<PlaceOrder> for TabCommand {
    fn from(cmd: PlaceOrder) -> Self {
        TabCommand::PlaceOrder(cmd)
    }
}

impl From<MarkDrinksServed> for TabCommand {
    fn from(cmd: MarkDrinksServed) -> Self {
        TabCommand::MarkDrinksServed(cmd)
    }
}

impl From<MarkFoodServed> for TabCommand {
    fn from(cmd: MarkFoodServed) -> Self {
        TabCommand::MarkFoodServed(cmd)
    }
}

impl From<CloseTab> for TabCommand {
    fn from(cmd: CloseTab) -> Self {
        TabCommand::CloseTab(cmd)
    }
}
