use crate::db_types::Order;

/// Emitted after a marketplace order has been successfully mirrored onto a merchant store and both records
/// committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMirroredEvent {
    pub merchant_order: Order,
    pub marketplace_order: Order,
}

impl OrderMirroredEvent {
    pub fn new(merchant_order: Order, marketplace_order: Order) -> Self {
        Self { merchant_order, marketplace_order }
    }
}

/// Emitted when an order pair is cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAnnulledEvent {
    pub merchant_order: Order,
}

impl OrderAnnulledEvent {
    pub fn new(merchant_order: Order) -> Self {
        Self { merchant_order }
    }
}
