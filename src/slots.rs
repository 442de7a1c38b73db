use std::collections::HashMap;

use crate::{
    alexa::{Intent, Slot},
    domain::{Amount, Receipt},
};

pub const SHOP_SLOT: &str = "SHOP";
pub const DATE_SLOT: &str = "DATE";
pub const CATEGORY_SLOT: &str = "CATEGORY";
pub const AMOUNT_EUROS_SLOT: &str = "AMOUNT_EUROS";
pub const AMOUNT_CENTS_SLOT: &str = "AMOUNT_CENTS";

/// Canonical value of the first authority when entity resolution matched,
/// the spoken value otherwise.
pub fn extract_slot_value(slot: &Slot) -> String {
    let resolved = slot
        .resolutions
        .as_ref()
        .and_then(|resolutions| resolutions.resolutions_per_authority.first())
        .and_then(|authority| authority.values.as_ref())
        .and_then(|values| values.first())
        .map(|wrapper| wrapper.value.name.clone());

    resolved.unwrap_or_else(|| raw_slot_value(slot))
}

fn raw_slot_value(slot: &Slot) -> String {
    slot.value.clone().unwrap_or_default()
}

fn slot_text(slots: &HashMap<String, Slot>, name: &str, resolve: bool) -> String {
    match slots.get(name) {
        Some(slot) if resolve => extract_slot_value(slot),
        Some(slot) => raw_slot_value(slot),
        None => String::new(),
    }
}

fn slot_number(slots: &HashMap<String, Slot>, name: &str) -> u64 {
    let Some(value) = slots.get(name).and_then(|slot| slot.value.as_deref()) else {
        return 0;
    };

    value.trim().parse::<u64>().unwrap_or_else(|err| {
        tracing::warn!("Ignoring unparsable {} slot value={:?}: {}", name, value, err);
        0
    })
}

pub fn build_receipt(intent: &Intent) -> Receipt {
    let slots = &intent.slots;

    let receipt = Receipt {
        date: slot_text(slots, DATE_SLOT, false),
        shop: slot_text(slots, SHOP_SLOT, true),
        amount: Amount::from_parts(
            slot_number(slots, AMOUNT_EUROS_SLOT),
            slot_number(slots, AMOUNT_CENTS_SLOT),
        ),
        category: slot_text(slots, CATEGORY_SLOT, true),
    };

    tracing::debug!("Built receipt from slots: {:?}", &receipt);

    receipt
}
