//! Custom attribute values (ECMA-335 II.23.3).
//!
//! A value blob holds a `0x0001` prolog, the constructor arguments back to back, and a list of
//! named field and property assignments. The crawler only needs the names of the assigned
//! members, which are API references of their own; [`NamedArguments`] walks a blob far enough
//! to report them.
//!
//! Fixed arguments of enum type carry no width in the blob. [`EnumResolver`] supplies the
//! underlying type: [`FixedEnumResolver`] from a table, [`AssemblyDirectoryResolver`] by
//! reading the defining assembly from disk. Enums defined in the module itself are sized from
//! their `value__` field without a resolver.
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.3 - Custom Attributes

mod enums;
mod types;
mod values;

pub use enums::{
    enum_index, local_enum_underlying_type, AssemblyDirectoryResolver, EnumResolver, EnumTypeName,
    FixedEnumResolver,
};
pub use types::*;
pub use values::{skip_type, NamedArguments};
