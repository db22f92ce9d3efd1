//! Tab aggregate implementation.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, EventBuffer};

use super::{
    CloseTab, ItemCategory, MarkDrinksServed, MarkFoodServed, MenuNumber, Money, OpenTab,
    OrderItem, PlaceOrder, TabCommand, TabError, TabEvent,
    events::{TabClosedData, TabOpenedData},
};

/// Tab aggregate root.
///
/// A tab is opened for a table, collects drink and food orders, tracks what
/// has been served and is closed once everything served is paid for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tab {
    id: Option<AggregateId>,

    /// Number of events applied.
    #[serde(default)]
    version: Version,

    table_number: u32,

    waiter: String,

    open: bool,

    /// Drinks ordered but not yet served, in order.
    outstanding_drinks: Vec<OrderItem>,

    /// Food ordered but not yet served, in order.
    outstanding_food: Vec<OrderItem>,

    /// Menu numbers of served items, in the order they were served.
    served_item_ids: Vec<MenuNumber>,

    /// Running value of everything served.
    served_value: Money,

    /// Set when the tab is closed.
    closed: Option<TabClosedData>,

    #[serde(skip)]
    changes: EventBuffer<TabEvent>,
}

impl Aggregate for Tab {
    type Event = TabEvent;
    type Command = TabCommand;
    type Error = TabError;

    fn aggregate_type() -> &'static str {
        "Tab"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn decide(&self, command: &TabCommand) -> Result<Vec<TabEvent>, TabError> {
        match command {
            TabCommand::OpenTab(cmd) => self.open_tab(cmd),
            TabCommand::PlaceOrder(cmd) => self.place_order(cmd),
            TabCommand::MarkDrinksServed(cmd) => self.mark_drinks_served(cmd),
            TabCommand::MarkFoodServed(cmd) => self.mark_food_served(cmd),
            TabCommand::CloseTab(cmd) => self.close(cmd),
        }
    }

    fn apply(&mut self, event: &TabEvent) {
        match event {
            TabEvent::TabOpened(data) => self.apply_opened(data),
            TabEvent::DrinksOrdered(data) => {
                self.outstanding_drinks.extend(data.items.iter().cloned());
            }
            TabEvent::FoodOrdered(data) => {
                self.outstanding_food.extend(data.items.iter().cloned());
            }
            TabEvent::DrinksServed(data) => {
                self.apply_served(ItemCategory::Drink, &data.menu_numbers);
            }
            TabEvent::FoodServed(data) => {
                self.apply_served(ItemCategory::Food, &data.menu_numbers);
            }
            TabEvent::TabClosed(data) => {
                self.open = false;
                self.closed = Some(data.clone());
            }
        }
        self.version = self.version.next();
    }

    fn changes(&self) -> &EventBuffer<TabEvent> {
        &self.changes
    }

    fn changes_mut(&mut self) -> &mut EventBuffer<TabEvent> {
        &mut self.changes
    }
}

// Query methods
impl Tab {
    pub fn table_number(&self) -> u32 {
        self.table_number
    }

    pub fn waiter(&self) -> &str {
        &self.waiter
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    pub fn outstanding_drinks(&self) -> &[OrderItem] {
        &self.outstanding_drinks
    }

    pub fn outstanding_food(&self) -> &[OrderItem] {
        &self.outstanding_food
    }

    /// Returns the menu numbers of served items, in service order.
    pub fn served_item_ids(&self) -> &[MenuNumber] {
        &self.served_item_ids
    }

    pub fn served_value(&self) -> Money {
        self.served_value
    }

    /// Returns the payment details once the tab is closed.
    pub fn closing(&self) -> Option<&TabClosedData> {
        self.closed.as_ref()
    }

    /// Returns the number of items ordered but not served.
    pub fn unserved_count(&self) -> usize {
        self.outstanding_drinks.len() + self.outstanding_food.len()
    }
}

// Command handlers (return events)
impl Tab {
    fn open_tab(&self, cmd: &OpenTab) -> Result<Vec<TabEvent>, TabError> {
        if self.id.is_some() {
            return Err(TabError::TabAlreadyOpen);
        }

        if cmd.table_number == 0 {
            return Err(TabError::TableNumberRequired);
        }

        if cmd.waiter.trim().is_empty() {
            return Err(TabError::WaiterRequired);
        }

        Ok(vec![TabEvent::tab_opened(
            cmd.tab_id,
            cmd.table_number,
            cmd.waiter.clone(),
        )])
    }

    /// Splits an order into one event per category that has items.
    fn place_order(&self, cmd: &PlaceOrder) -> Result<Vec<TabEvent>, TabError> {
        self.ensure_open()?;

        if cmd.items.is_empty() {
            return Err(TabError::EmptyOrder);
        }

        if let Some(item) = cmd.items.iter().find(|item| item.price.is_negative()) {
            return Err(TabError::InvalidPrice {
                menu_number: item.menu_number,
            });
        }

        // Everything ordered must stay summable, so serving and closing
        // never overflow.
        self.outstanding_drinks
            .iter()
            .chain(&self.outstanding_food)
            .chain(&cmd.items)
            .try_fold(self.served_value, |total, item| total.checked_add(item.price))
            .ok_or(TabError::OrderTooLarge)?;

        let (drinks, food): (Vec<OrderItem>, Vec<OrderItem>) =
            cmd.items.iter().cloned().partition(OrderItem::is_drink);

        let mut events = Vec::with_capacity(2);
        if !drinks.is_empty() {
            events.push(TabEvent::drinks_ordered(cmd.tab_id, drinks));
        }
        if !food.is_empty() {
            events.push(TabEvent::food_ordered(cmd.tab_id, food));
        }

        Ok(events)
    }

    fn mark_drinks_served(&self, cmd: &MarkDrinksServed) -> Result<Vec<TabEvent>, TabError> {
        self.ensure_open()?;
        Self::ensure_outstanding(&self.outstanding_drinks, &cmd.menu_numbers, |menu_number| {
            TabError::DrinksNotOutstanding { menu_number }
        })?;

        Ok(vec![TabEvent::drinks_served(
            cmd.tab_id,
            cmd.menu_numbers.clone(),
        )])
    }

    fn mark_food_served(&self, cmd: &MarkFoodServed) -> Result<Vec<TabEvent>, TabError> {
        self.ensure_open()?;
        Self::ensure_outstanding(&self.outstanding_food, &cmd.menu_numbers, |menu_number| {
            TabError::FoodNotOutstanding { menu_number }
        })?;

        Ok(vec![TabEvent::food_served(
            cmd.tab_id,
            cmd.menu_numbers.clone(),
        )])
    }

    fn close(&self, cmd: &CloseTab) -> Result<Vec<TabEvent>, TabError> {
        self.ensure_open()?;

        let count = self.unserved_count();
        if count > 0 {
            return Err(TabError::UnservedItems { count });
        }

        if cmd.amount_paid.is_negative() {
            return Err(TabError::InvalidPayment);
        }

        if cmd.amount_paid < self.served_value {
            return Err(TabError::MustPayEnough {
                owed: self.served_value,
                paid: cmd.amount_paid,
            });
        }

        Ok(vec![TabEvent::tab_closed(
            cmd.tab_id,
            cmd.amount_paid,
            self.served_value,
        )])
    }

    fn ensure_open(&self) -> Result<(), TabError> {
        if !self.open {
            return Err(TabError::TabNotOpen);
        }
        Ok(())
    }

    /// Checks every menu number against the outstanding items, counting
    /// repeats: two beers served need two beers outstanding.
    fn ensure_outstanding(
        outstanding: &[OrderItem],
        menu_numbers: &[MenuNumber],
        not_outstanding: impl Fn(MenuNumber) -> TabError,
    ) -> Result<(), TabError> {
        if menu_numbers.is_empty() {
            return Err(TabError::NothingToServe);
        }

        let mut remaining: Vec<MenuNumber> =
            outstanding.iter().map(|item| item.menu_number).collect();

        for &menu_number in menu_numbers {
            match remaining.iter().position(|&n| n == menu_number) {
                Some(index) => {
                    remaining.remove(index);
                }
                None => return Err(not_outstanding(menu_number)),
            }
        }

        Ok(())
    }
}

// Event handlers
impl Tab {
    fn apply_opened(&mut self, data: &TabOpenedData) {
        self.id = Some(data.tab_id);
        self.table_number = data.table_number;
        self.waiter = data.waiter.clone();
        self.open = true;
    }

    fn apply_served(&mut self, category: ItemCategory, menu_numbers: &[MenuNumber]) {
        let outstanding = match category {
            ItemCategory::Drink => &mut self.outstanding_drinks,
            ItemCategory::Food => &mut self.outstanding_food,
        };

        for &menu_number in menu_numbers {
            if let Some(index) = outstanding
                .iter()
                .position(|item| item.menu_number == menu_number)
            {
                let item = outstanding.remove(index);
                self.served_value += item.price;
                self.served_item_ids.push(menu_number);
            }
        }
    }
}
