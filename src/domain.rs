use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A non-negative euro amount held as whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Amount {
    cents: u64,
}

impl Amount {
    pub fn from_parts(euros: u64, cents: u64) -> Self {
        Amount {
            cents: euros.saturating_mul(100).saturating_add(cents),
        }
    }

    pub fn euros(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Cell value for the spreadsheet. Whole euro amounts stay integers.
    pub fn to_cell(&self) -> Value {
        if self.cents % 100 == 0 {
            json!(self.cents / 100)
        } else {
            json!(self.euros())
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.euros())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub date: String,
    pub shop: String,
    pub amount: Amount,
    pub category: String,
}

impl Receipt {
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            json!(self.date),
            json!(self.shop),
            self.amount.to_cell(),
            json!(self.category),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpreadsheetBinding {
    pub spreadsheet_id: String,
    /// Only set on the request that created the spreadsheet.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub spreadsheet_title: Option<String>,
}

impl UserSpreadsheetBinding {
    pub fn existing(spreadsheet_id: impl Into<String>) -> Self {
        UserSpreadsheetBinding {
            spreadsheet_id: spreadsheet_id.into(),
            spreadsheet_title: None,
        }
    }
}
