use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub id: ProductId,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_downloadable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductKind {
    Simple,
    Variable { variations: Vec<Variation> },
}

/// Catalog product as exposed by the host store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_downloadable: bool,
    pub kind: ProductKind,
}

impl Product {
    pub fn simple(id: ProductId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_virtual: false,
            is_downloadable: false,
            kind: ProductKind::Simple,
        }
    }

    pub fn variable(id: ProductId, name: impl Into<String>, variations: Vec<Variation>) -> Self {
        Self {
            kind: ProductKind::Variable { variations },
            ..Self::simple(id, name)
        }
    }

    pub fn virtual_product(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn downloadable(mut self) -> Self {
        self.is_downloadable = true;
        self
    }

    pub fn variations(&self) -> &[Variation] {
        match &self.kind {
            ProductKind::Simple => &[],
            ProductKind::Variable { variations } => variations,
        }
    }
}
