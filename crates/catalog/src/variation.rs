use serde::{Deserialize, Serialize};

/// The attributes that tell two SKUs of the same product apart.
///
/// Two selectors address the same variation when every attribute matches,
/// including absent memory sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationSelector {
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rom: Option<String>,
}

impl VariationSelector {
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            ram: None,
            rom: None,
        }
    }

    pub fn with_memory(mut self, ram: impl Into<String>, rom: impl Into<String>) -> Self {
        self.ram = Some(ram.into());
        self.rom = Some(rom.into());
        self
    }

    /// Human-readable label, e.g. `Black / 8GB / 256GB`.
    pub fn label(&self) -> String {
        let mut parts = vec![self.color.as_str()];
        if let Some(ram) = &self.ram {
            parts.push(ram);
        }
        if let Some(rom) = &self.rom {
            parts.push(rom);
        }
        parts.join(" / ")
    }
}

impl core::fmt::Display for VariationSelector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.label())
    }
}

/// One SKU facet of a product with its own stock and optional price override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    #[serde(flatten)]
    pub selector: VariationSelector,
    pub stock: u32,
    /// Overrides the product price when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
}

impl Variation {
    pub fn new(selector: VariationSelector, stock: u32) -> Self {
        Self {
            selector,
            stock,
            price: None,
        }
    }

    pub fn priced(mut self, price: u64) -> Self {
        self.price = Some(price);
        self
    }
}
