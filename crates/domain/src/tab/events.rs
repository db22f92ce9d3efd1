//! Tab domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{MenuNumber, Money, OrderItem};

/// Events that can occur on a tab aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TabEvent {
    /// A tab was opened for a table.
    TabOpened(TabOpenedData),

    /// Drinks were ordered.
    DrinksOrdered(DrinksOrderedData),

    /// Food was ordered.
    FoodOrdered(FoodOrderedData),

    /// Drinks were brought to the table.
    DrinksServed(DrinksServedData),

    /// Food was brought to the table.
    FoodServed(FoodServedData),

    /// The tab was paid and closed.
    TabClosed(TabClosedData),
}

impl DomainEvent for TabEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TabEvent::TabOpened(_) => "TabOpened",
            TabEvent::DrinksOrdered(_) => "DrinksOrdered",
            TabEvent::FoodOrdered(_) => "FoodOrdered",
            TabEvent::DrinksServed(_) => "DrinksServed",
            TabEvent::FoodServed(_) => "FoodServed",
            TabEvent::TabClosed(_) => "TabClosed",
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        match self {
            TabEvent::TabOpened(data) => data.tab_id,
            TabEvent::DrinksOrdered(data) => data.tab_id,
            TabEvent::FoodOrdered(data) => data.tab_id,
            TabEvent::DrinksServed(data) => data.tab_id,
            TabEvent::FoodServed(data) => data.tab_id,
            TabEvent::TabClosed(data) => data.tab_id,
        }
    }
}

/// Data for TabOpened event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabOpenedData {
    pub tab_id: AggregateId,
    pub table_number: u32,
    pub waiter: String,
}

/// Data for DrinksOrdered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinksOrderedData {
    pub tab_id: AggregateId,

    /// Only drink items, in the order they were placed.
    pub items: Vec<OrderItem>,
}

/// Data for FoodOrdered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodOrderedData {
    pub tab_id: AggregateId,

    /// Only food items, in the order they were placed.
    pub items: Vec<OrderItem>,
}

/// Data for DrinksServed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinksServedData {
    pub tab_id: AggregateId,
    pub menu_numbers: Vec<MenuNumber>,
}

/// Data for FoodServed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodServedData {
    pub tab_id: AggregateId,
    pub menu_numbers: Vec<MenuNumber>,
}

/// Data for TabClosed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabClosedData {
    pub tab_id: AggregateId,
    pub amount_paid: Money,

    /// Value of everything served.
    pub order_value: Money,

    /// What was paid beyond the order value.
    pub tip_value: Money,
}

// Convenience constructors
impl TabEvent {
    pub fn tab_opened(tab_id: AggregateId, table_number: u32, waiter: impl Into<String>) -> Self {
        TabEvent::TabOpened(TabOpenedData {
            tab_id,
            table_number,
            waiter: waiter.into(),
        })
    }

    pub fn drinks_ordered(tab_id: AggregateId, items: Vec<OrderItem>) -> Self {
        TabEvent::DrinksOrdered(DrinksOrderedData { tab_id, items })
    }

    pub fn food_ordered(tab_id: AggregateId, items: Vec<OrderItem>) -> Self {
        TabEvent::FoodOrdered(FoodOrderedData { tab_id, items })
    }

    pub fn drinks_served(tab_id: AggregateId, menu_numbers: Vec<MenuNumber>) -> Self {
        TabEvent::DrinksServed(DrinksServedData {
            tab_id,
            menu_numbers,
        })
    }

    pub fn food_served(tab_id: AggregateId, menu_numbers: Vec<MenuNumber>) -> Self {
        TabEvent::FoodServed(FoodServedData {
            tab_id,
            menu_numbers,
        })
    }

    pub fn tab_closed(tab_id: AggregateId, amount_paid: Money, order_value: Money) -> Self {
        TabEvent::TabClosed(TabClosedData {
            tab_id,
            amount_paid,
            order_value,
            tip_value: amount_paid - order_value,
        })
    }
}
