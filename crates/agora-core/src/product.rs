//! Product registry.
//!
//! Ordered list of tradable product names. A product's identity is its
//! position in the list; names are unique.

use alloc::string::String;
use alloc::vec::Vec;
use crate::order::ProductId;

/// Ordered, immutable list of product names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductRegistry {
    names: Vec<String>,
}

impl ProductRegistry {
    /// Build a registry from names in index order.
    ///
    /// Returns the first duplicated name on failure.
    pub fn new<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self { names: Vec::new() };
        for name in names {
            let name = name.into();
            if registry.index_of(&name).is_some() {
                return Err(name);
            }
            registry.names.push(name);
        }
        Ok(registry)
    }

    /// Number of products.
    #[inline]
    pub fn product_count(&self) -> usize {
        self.names.len()
    }

    /// Resolve a product name to its index.
    pub fn index_of(&self, name: &str) -> Option<ProductId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| ProductId(idx as u32))
    }

    /// Name of the product at `product`.
    pub fn name(&self, product: ProductId) -> Option<&str> {
        self.names.get(product.index()).map(String::as_str)
    }

    /// Iterate products in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ProductId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (ProductId(idx as u32), name.as_str()))
    }
}
