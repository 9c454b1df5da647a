use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of the partner-shop table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: u32,
    pub category_main: String,
    /// Second category label; empty when the row carries only one
    pub category_sub: String,
    pub name: String,
    /// Empty when the row lists no number
    pub phone: String,
    pub city: String,
    pub district: String,
    pub address: String,
    pub offers: String,
}

impl Shop {
    /// Category labels joined for display, e.g. `生活・餐飲`
    pub fn category(&self) -> String {
        if self.category_sub.is_empty() {
            self.category_main.clone()
        } else {
            format!("{}・{}", self.category_main, self.category_sub)
        }
    }

    /// Text fields by name, in column order
    pub fn fields(&self) -> [(&'static str, &str); 8] {
        [
            ("category_main", &self.category_main),
            ("category_sub", &self.category_sub),
            ("name", &self.name),
            ("phone", &self.phone),
            ("city", &self.city),
            ("district", &self.district),
            ("address", &self.address),
            ("offers", &self.offers),
        ]
    }
}

impl fmt::Display for Shop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {} {}{}{}",
            self.id,
            self.category(),
            self.name,
            self.city,
            self.district,
            self.address
        )
    }
}
