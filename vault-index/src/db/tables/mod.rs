//! Table operations - each module contains `impl IndexStore` blocks for one table

mod notes;
