//! Search translation
//!
//! This module walks parsed FIQL condition trees and builds either a connector
//! `Filter` or a persistence `SearchCond`.

pub mod cond;
pub mod cond_visitor;
pub mod converter;
pub mod filter;
pub mod filter_visitor;
mod special_attr;
pub mod visitor;


pub use cond::{AttrCond, AttrCondType, Leaf, SearchCond};
pub use cond_visitor::SearchCondVisitor;
pub use converter::*;
pub use filter::{Attribute, Filter};
pub use filter_visitor::FilterVisitor;
pub use special_attr::SpecialAttr;
pub use visitor::{walk, ConditionVisitor};
