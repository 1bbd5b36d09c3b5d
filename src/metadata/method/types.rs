//! Method flags (II.23.1.10, II.23.1.11) and method-body header flags (II.25.4).

use bitflags::bitflags;

/// Bitmask for `CODE_TYPE` extraction
pub const METHOD_IMPL_CODE_TYPE_MASK: u16 = 0x0003;
/// Bitmask for `ACCESS` extraction
pub const METHOD_ACCESS_MASK: u16 = 0x0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method implementation flags
    pub struct MethodImplAttributes: u16 {
        /// Method impl is native
        const NATIVE = 0x0001;
        /// Method impl is OPTIL
        const OPTIL = 0x0002;
        /// Method impl is provided by the runtime
        const RUNTIME = 0x0003;
        /// Method impl is unmanaged, otherwise managed
        const UNMANAGED = 0x0004;
        /// Method cannot be inlined
        const NO_INLINING = 0x0008;
        /// Method is defined; used primarily in merge scenarios
        const FORWARD_REF = 0x0010;
        /// Method is a synchronized method
        const SYNCHRONIZED = 0x0020;
        /// Method signature is exported exactly as declared
        const PRESERVE_SIG = 0x0080;
        /// Method is implemented by the runtime itself
        const INTERNAL_CALL = 0x1000;
    }
}

impl MethodImplAttributes {
    /// The code type bits (IL, native, OPTIL or runtime).
    #[must_use]
    pub fn code_type(self) -> u16 {
        self.bits() & METHOD_IMPL_CODE_TYPE_MASK
    }

    /// Returns `true` if the method can carry an IL body.
    ///
    /// Runtime, internal-call, unmanaged, native and OPTIL methods never do.
    #[must_use]
    pub fn has_il_body(self) -> bool {
        self.code_type() == 0
            && !self.intersects(MethodImplAttributes::UNMANAGED | MethodImplAttributes::INTERNAL_CALL)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method attribute flags
    pub struct MethodAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessibly by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Method is exported through a thunk
        const UNMANAGED_EXPORT = 0x0008;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method may not be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method can only be overridden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RTSPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through `PInvoke`
        const PINVOKE_IMPL = 0x2000;
        /// Method has security associated with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method body header flags
    pub struct MethodBodyFlags: u16 {
        /// Tiny header, code size in the upper six bits
        const TINY_FORMAT = 0x2;
        /// Fat header
        const FAT_FORMAT = 0x3;
        /// More sections follow after the code
        const MORE_SECTS = 0x8;
        /// Call the default constructor on all local variables
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Extra data section flags
    pub struct SectionFlags: u8 {
        /// Exception handling data
        const EHTABLE = 0x1;
        /// Reserved, shall be 0
        const OPT_ILTABLE = 0x2;
        /// Data format is of the fat variant
        const FAT_FORMAT = 0x40;
        /// Another data section occurs after this one
        const MORE_SECTS = 0x80;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn il_body_by_impl_flags() {
        assert!(MethodImplAttributes::empty().has_il_body());
        assert!(MethodImplAttributes::NO_INLINING.has_il_body());
        assert!(!MethodImplAttributes::RUNTIME.has_il_body());
        assert!(!MethodImplAttributes::NATIVE.has_il_body());
        assert!(!MethodImplAttributes::OPTIL.has_il_body());
        assert!(!MethodImplAttributes::UNMANAGED.has_il_body());
        assert!(!MethodImplAttributes::INTERNAL_CALL.has_il_body());
    }

    #[test]
    fn code_type() {
        let flags = MethodImplAttributes::from_bits_retain(0x0083);
        assert_eq!(flags.code_type(), 3);
        assert!(flags.contains(MethodImplAttributes::PRESERVE_SIG));
    }
}
