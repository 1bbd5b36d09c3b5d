//! Rows of the metadata tables (II.22).
//!
//! Only the tables the crawler walks have row types. Every other table is still sized
//! correctly through [`TableInfo`], so the offsets of the tables that follow it are right.

mod assembly;
mod customattribute;
mod event;
mod field;
mod interfaceimpl;
mod memberref;
mod methoddef;
mod methodimpl;
mod methodsemantics;
mod nestedclass;
mod property;
mod typedef;
mod typeref;
mod typespec;
mod types;

pub use assembly::{AssemblyFlags, AssemblyRaw, AssemblyRefRaw, AssemblyVersion};
pub use customattribute::CustomAttributeRaw;
pub use event::{EventMapRaw, EventPtrRaw, EventRaw};
pub use field::{FieldPtrRaw, FieldRaw};
pub use interfaceimpl::InterfaceImplRaw;
pub use memberref::MemberRefRaw;
pub use methoddef::{MethodDefRaw, MethodPtrRaw};
pub use methodimpl::MethodImplRaw;
pub use methodsemantics::{MethodSemanticsAttributes, MethodSemanticsRaw};
pub use nestedclass::NestedClassRaw;
pub use property::{PropertyMapRaw, PropertyPtrRaw, PropertyRaw};
pub use typedef::{TypeAttributes, TypeDefRaw};
pub use typeref::TypeRefRaw;
pub use typespec::TypeSpecRaw;
pub use types::*;
