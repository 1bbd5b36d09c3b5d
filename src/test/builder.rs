//! Writes minimal managed modules.
//!
//! The image is a PE32 DLL with a single `.text` section holding the CLR header, the method
//! bodies and the metadata. Only the `#~`, `#Strings`, `#GUID` and `#Blob` streams are written.
//!
//! Members are laid out in the order they are added, and a type's fields, methods, properties
//! and events must form one contiguous run. Add the members of a type before those of any type
//! defined after it; the builder panics otherwise, since the returned rows would not match the
//! written ones.

use std::collections::HashMap;

use strum::EnumCount;

use crate::metadata::{
    cor20header::Cor20Header,
    root::CIL_HEADER_MAGIC,
    tables::{
        AssemblyVersion, CodedIndexType, MethodSemanticsAttributes, TableId, TableInfo,
        TypeAttributes,
    },
    token::Token,
};

const SECTION_RVA: u32 = 0x2000;
const SECTION_ALIGNMENT: u32 = 0x2000;
const FILE_ALIGNMENT: u32 = 0x200;
const RUNTIME_VERSION: &str = "v4.0.30319";
const PE_OFFSET: usize = 0x80;

/// Public key token of the framework assemblies referenced by [`ModuleBuilder::type_ref`].
const FRAMEWORK_TOKEN: [u8; 8] = [0xB0, 0x3F, 0x5F, 0x7F, 0x11, 0xD5, 0x0A, 0x3A];

/// Tables the writer keeps sorted, as in the `Sorted` vector of compiler output.
const SORTED_TABLES: u64 = 0x0000_1600_3301_FA00;

const CLASS_FLAGS: u32 = 0x0010_0001;
const NESTED_CLASS_FLAGS: u32 = 0x0010_0002;
const FIELD_FLAGS: u16 = 0x0006;
const METHOD_FLAGS: u16 = 0x0086;
const ABSTRACT_METHOD_FLAGS: u16 = 0x05C6;

/// An interned heap: the offset of every value already written.
struct Heap {
    data: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl Heap {
    fn new() -> Self {
        Heap {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    fn string(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }

        self.intern(value.as_bytes(), |data, value| {
            data.extend_from_slice(value);
            data.push(0);
        })
    }

    fn blob(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }

        self.intern(value, |data, value| {
            compressed_uint(data, len_u32(value.len()));
            data.extend_from_slice(value);
        })
    }

    fn intern(&mut self, value: &[u8], write: impl FnOnce(&mut Vec<u8>, &[u8])) -> u32 {
        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }

        let offset = len_u32(self.data.len());
        write(&mut self.data, value);
        self.offsets.insert(value.to_vec(), offset);
        offset
    }

    fn is_large(&self) -> bool {
        self.data.len() > usize::from(u16::MAX)
    }
}

struct TypeDefEntry {
    flags: u32,
    name: u32,
    namespace: u32,
    extends: Token,
}

struct FieldEntry {
    owner: u32,
    name: u32,
    signature: u32,
}

struct MethodEntry {
    owner: u32,
    impl_flags: u16,
    flags: u16,
    name: u32,
    signature: u32,
    code: Option<Vec<u8>>,
    catches: Vec<Token>,
}

struct MemberEntry {
    owner: u32,
    name: u32,
    value: u32,
}

/// Builder of an in-memory managed module.
///
/// Row numbers and tokens returned by the builder are the ones the written module has.
///
/// # Example
///
/// ```rust
/// use usagescope::metadata::reader::ModuleReader;
/// use usagescope::test::ModuleBuilder;
///
/// let mut builder = ModuleBuilder::new("Sample");
/// let object = builder.type_ref("System", "Object");
/// builder.type_def("Sample", "Widget", object);
///
/// let reader = ModuleReader::open(builder.build())?;
/// assert_eq!(reader.type_defs().row_count(), 2);
/// # Ok::<(), usagescope::Error>(())
/// ```
pub struct ModuleBuilder {
    name: u32,
    with_assembly: bool,
    strings: Heap,
    blobs: Heap,
    framework: Option<Token>,
    assembly_refs: Vec<Vec<u32>>,
    type_refs: Vec<(Token, u32, u32)>,
    type_defs: Vec<TypeDefEntry>,
    nested: Vec<(u32, u32)>,
    fields: Vec<FieldEntry>,
    methods: Vec<MethodEntry>,
    properties: Vec<MemberEntry>,
    events: Vec<(MemberEntry, Token)>,
    semantics: Vec<(u16, u32, Token)>,
    member_refs: Vec<(Token, u32, u32)>,
    type_specs: Vec<u32>,
    interface_impls: Vec<(u32, Token)>,
    method_impls: Vec<(u32, Token, Token)>,
    custom_attributes: Vec<(Token, Token, u32)>,
}

impl ModuleBuilder {
    /// A module and assembly named `name` with only the `<Module>` type.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut strings = Heap::new();
        let name = strings.string(name);
        let module_type = strings.string("<Module>");

        ModuleBuilder {
            name,
            with_assembly: true,
            strings,
            blobs: Heap::new(),
            framework: None,
            assembly_refs: Vec::new(),
            type_refs: Vec::new(),
            type_defs: vec![TypeDefEntry {
                flags: 0,
                name: module_type,
                namespace: 0,
                extends: Token::default(),
            }],
            nested: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            semantics: Vec::new(),
            member_refs: Vec::new(),
            type_specs: Vec::new(),
            interface_impls: Vec::new(),
            method_impls: Vec::new(),
            custom_attributes: Vec::new(),
        }
    }

    /// Leaves out the `Assembly` row, as in a `.netmodule`.
    #[must_use]
    pub fn without_assembly(mut self) -> Self {
        self.with_assembly = false;
        self
    }

    /// The token of the `Assembly` row.
    #[must_use]
    pub fn assembly_token(&self) -> Token {
        Token::from_parts(TableId::Assembly, 1)
    }

    /// Adds an assembly reference.
    pub fn assembly_ref(
        &mut self,
        name: &str,
        version: AssemblyVersion,
        public_key_or_token: &[u8],
        flags: u32,
    ) -> Token {
        let row = vec![
            u32::from(version.major),
            u32::from(version.minor),
            u32::from(version.build),
            u32::from(version.revision),
            flags,
            self.blobs.blob(public_key_or_token),
            self.strings.string(name),
            0,
            0,
        ];
        self.assembly_refs.push(row);
        Token::from_parts(TableId::AssemblyRef, len_u32(self.assembly_refs.len()))
    }

    /// Adds a reference to a top-level type of `System.Runtime`.
    pub fn type_ref(&mut self, namespace: &str, name: &str) -> Token {
        let scope = match self.framework {
            Some(scope) => scope,
            None => {
                let scope = self.assembly_ref(
                    "System.Runtime",
                    AssemblyVersion::new(8, 0, 0, 0),
                    &FRAMEWORK_TOKEN,
                    0,
                );
                self.framework = Some(scope);
                scope
            }
        };

        self.push_type_ref(scope, namespace, name)
    }

    /// Adds a reference to a type nested in the referenced type `parent`.
    pub fn nested_type_ref(&mut self, parent: Token, name: &str) -> Token {
        self.push_type_ref(parent, "", name)
    }

    fn push_type_ref(&mut self, scope: Token, namespace: &str, name: &str) -> Token {
        let entry = (scope, self.strings.string(name), self.strings.string(namespace));
        self.type_refs.push(entry);
        Token::from_parts(TableId::TypeRef, len_u32(self.type_refs.len()))
    }

    /// Adds a public class; returns its `TypeDef` row.
    pub fn type_def(&mut self, namespace: &str, name: &str, extends: Token) -> u32 {
        self.push_type_def(CLASS_FLAGS, namespace, name, extends)
    }

    /// Adds a public interface; returns its `TypeDef` row.
    pub fn interface_def(&mut self, namespace: &str, name: &str) -> u32 {
        let flags = TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT | 0x0000_0001;
        self.push_type_def(flags, namespace, name, Token::default())
    }

    /// Adds a public class nested in `enclosing`; returns its `TypeDef` row.
    pub fn nested_type_def(&mut self, enclosing: u32, name: &str, extends: Token) -> u32 {
        let rid = self.push_type_def(NESTED_CLASS_FLAGS, "", name, extends);
        self.nested.push((rid, enclosing));
        rid
    }

    fn push_type_def(&mut self, flags: u32, namespace: &str, name: &str, extends: Token) -> u32 {
        let entry = TypeDefEntry {
            flags,
            name: self.strings.string(name),
            namespace: self.strings.string(namespace),
            extends,
        };
        self.type_defs.push(entry);
        len_u32(self.type_defs.len())
    }

    /// Records that class `class` implements `interface`.
    pub fn interface_impl(&mut self, class: u32, interface: Token) {
        self.interface_impls.push((class, interface));
    }

    /// Adds a public field; returns its `Field` row.
    ///
    /// # Panics
    ///
    /// Panics if a type defined after `owner` already has fields.
    pub fn field(&mut self, owner: u32, name: &str, signature: &[u8]) -> u32 {
        assert_in_order(self.fields.last().map(|field| field.owner), owner);

        let entry = FieldEntry {
            owner,
            name: self.strings.string(name),
            signature: self.blobs.blob(signature),
        };
        self.fields.push(entry);
        len_u32(self.fields.len())
    }

    /// Adds a public method; returns its `MethodDef` row.
    ///
    /// `code` is the raw IL of the body. A method without code is abstract and virtual.
    ///
    /// # Panics
    ///
    /// Panics if a type defined after `owner` already has methods.
    pub fn method(&mut self, owner: u32, name: &str, signature: &[u8], code: Option<&[u8]>) -> u32 {
        assert_in_order(self.methods.last().map(|method| method.owner), owner);

        let entry = MethodEntry {
            owner,
            impl_flags: 0,
            flags: if code.is_some() {
                METHOD_FLAGS
            } else {
                ABSTRACT_METHOD_FLAGS
            },
            name: self.strings.string(name),
            signature: self.blobs.blob(signature),
            code: code.map(<[u8]>::to_vec),
            catches: Vec::new(),
        };
        self.methods.push(entry);
        len_u32(self.methods.len())
    }

    /// Replaces the `MethodAttributes` of `method`.
    pub fn method_flags(&mut self, method: u32, flags: u16) {
        if let Some(entry) = self.method_entry(method) {
            entry.flags = flags;
        }
    }

    /// Replaces the `MethodImplAttributes` of `method`.
    pub fn method_impl_flags(&mut self, method: u32, flags: u16) {
        if let Some(entry) = self.method_entry(method) {
            entry.impl_flags = flags;
        }
    }

    /// Adds a typed catch clause for `class` covering the whole body of `method`.
    pub fn catch_clause(&mut self, method: u32, class: Token) {
        if let Some(entry) = self.method_entry(method) {
            entry.catches.push(class);
        }
    }

    fn method_entry(&mut self, method: u32) -> Option<&mut MethodEntry> {
        let index = usize::try_from(method.checked_sub(1)?).ok()?;
        self.methods.get_mut(index)
    }

    /// Records that `body` of class `class` implements `declaration`.
    pub fn method_impl(&mut self, class: u32, body: Token, declaration: Token) {
        self.method_impls.push((class, body, declaration));
    }

    /// Adds a property; returns its `Property` row.
    ///
    /// # Panics
    ///
    /// Panics if a type defined after `owner` already has properties.
    pub fn property(&mut self, owner: u32, name: &str, signature: &[u8]) -> u32 {
        assert_in_order(self.properties.last().map(|property| property.owner), owner);

        let entry = MemberEntry {
            owner,
            name: self.strings.string(name),
            value: self.blobs.blob(signature),
        };
        self.properties.push(entry);
        len_u32(self.properties.len())
    }

    /// Makes `method` the getter of `property`.
    pub fn property_getter(&mut self, property: u32, method: u32) {
        self.semantics.push((
            MethodSemanticsAttributes::GETTER.bits(),
            method,
            Token::from_parts(TableId::Property, property),
        ));
    }

    /// Adds an event of delegate type `event_type`; returns its `Event` row.
    ///
    /// # Panics
    ///
    /// Panics if a type defined after `owner` already has events.
    pub fn event(&mut self, owner: u32, name: &str, event_type: Token) -> u32 {
        assert_in_order(self.events.last().map(|(event, _)| event.owner), owner);

        let entry = MemberEntry {
            owner,
            name: self.strings.string(name),
            value: 0,
        };
        self.events.push((entry, event_type));
        len_u32(self.events.len())
    }

    /// Makes `method` an accessor of `event` with the given `MethodSemantics` flags.
    pub fn event_accessor(&mut self, event: u32, method: u32, semantics: MethodSemanticsAttributes) {
        self.semantics.push((
            semantics.bits(),
            method,
            Token::from_parts(TableId::Event, event),
        ));
    }

    /// Adds a member reference; returns its token.
    pub fn member_ref(&mut self, parent: Token, name: &str, signature: &[u8]) -> Token {
        let entry = (parent, self.strings.string(name), self.blobs.blob(signature));
        self.member_refs.push(entry);
        Token::from_parts(TableId::MemberRef, len_u32(self.member_refs.len()))
    }

    /// Adds a type specification; returns its token.
    pub fn type_spec(&mut self, signature: &[u8]) -> Token {
        let blob = self.blobs.blob(signature);
        self.type_specs.push(blob);
        Token::from_parts(TableId::TypeSpec, len_u32(self.type_specs.len()))
    }

    /// Attaches a custom attribute with the given constructor and value blob to `parent`.
    pub fn custom_attribute(&mut self, parent: Token, constructor: Token, value: &[u8]) {
        let blob = self.blobs.blob(value);
        self.custom_attributes.push((parent, constructor, blob));
    }

    /// Writes the module image.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut text = vec![0_u8; Cor20Header::SIZE];

        let mut rvas = Vec::with_capacity(self.methods.len());
        for method in &self.methods {
            match &method.code {
                Some(code) => {
                    align(&mut text, 4);
                    rvas.push(SECTION_RVA + len_u32(text.len()));
                    text.extend(method_body(code, &method.catches));
                }
                None => rvas.push(0),
            }
        }

        align(&mut text, 4);
        let metadata_rva = SECTION_RVA + len_u32(text.len());
        let metadata = self.metadata(&rvas);
        let metadata_size = len_u32(metadata.len());
        text.extend(metadata);

        let mut clr = Vec::with_capacity(Cor20Header::SIZE);
        clr.extend(len_u32(Cor20Header::SIZE).to_le_bytes());
        clr.extend(2_u16.to_le_bytes());
        clr.extend(5_u16.to_le_bytes());
        clr.extend(metadata_rva.to_le_bytes());
        clr.extend(metadata_size.to_le_bytes());
        // ILONLY
        clr.extend(1_u32.to_le_bytes());
        text[..clr.len()].copy_from_slice(&clr);

        pe_image(&text)
    }

    fn metadata(&self, rvas: &[u32]) -> Vec<u8> {
        let mut guids = Vec::with_capacity(16);
        guids.extend_from_slice(&[0x5C, 0x0E, 0x1A, 0x7D, 0x2B, 0x43, 0x4F, 0x19]);
        guids.extend_from_slice(&self.name.to_le_bytes());
        guids.extend_from_slice(&[0x8A, 0x61, 0x90, 0x33]);

        let tables = self.tables_stream(rvas);
        let mut strings = self.strings.data.clone();
        align(&mut strings, 4);
        let mut blobs = self.blobs.data.clone();
        align(&mut blobs, 4);

        let streams: [(&str, &[u8]); 4] = [
            ("#~", &tables),
            ("#Strings", &strings),
            ("#GUID", &guids),
            ("#Blob", &blobs),
        ];

        let mut version = RUNTIME_VERSION.as_bytes().to_vec();
        version.push(0);
        align(&mut version, 4);

        let headers_size: usize = streams
            .iter()
            .map(|(name, _)| 8 + (name.len() + 4) / 4 * 4)
            .sum();
        let mut offset = len_u32(16 + version.len() + 4 + headers_size);

        let mut root = Vec::new();
        root.extend(CIL_HEADER_MAGIC.to_le_bytes());
        root.extend(1_u16.to_le_bytes());
        root.extend(1_u16.to_le_bytes());
        root.extend(0_u32.to_le_bytes());
        root.extend(len_u32(version.len()).to_le_bytes());
        root.extend(&version);
        root.extend(0_u16.to_le_bytes());
        root.extend(4_u16.to_le_bytes());

        for (name, data) in &streams {
            root.extend(offset.to_le_bytes());
            root.extend(len_u32(data.len()).to_le_bytes());
            root.extend(name.as_bytes());
            root.push(0);
            align(&mut root, 4);
            offset += len_u32(data.len());
        }

        for (_, data) in &streams {
            root.extend_from_slice(data);
        }

        root
    }

    fn tables_stream(&self, rvas: &[u32]) -> Vec<u8> {
        let rows = self.rows(rvas);

        let mut counts = [0_u32; TableId::COUNT];
        for (table, table_rows) in &rows {
            counts[*table as usize] = len_u32(table_rows.len());
        }

        let heap_sizes = u8::from(self.strings.is_large()) | (u8::from(self.blobs.is_large()) << 2);
        let info = TableInfo::new(&counts, heap_sizes);

        let valid = rows
            .iter()
            .filter(|(_, table_rows)| !table_rows.is_empty())
            .fold(0_u64, |valid, (table, _)| valid | (1 << *table as u64));

        let mut stream = Vec::new();
        stream.extend(0_u32.to_le_bytes());
        stream.push(2);
        stream.push(0);
        stream.push(heap_sizes);
        stream.push(1);
        stream.extend(valid.to_le_bytes());
        stream.extend(SORTED_TABLES.to_le_bytes());

        for (_, table_rows) in rows.iter().filter(|(_, table_rows)| !table_rows.is_empty()) {
            stream.extend(len_u32(table_rows.len()).to_le_bytes());
        }

        for (table, table_rows) in &rows {
            for row in table_rows {
                for (column, value) in table.columns().iter().zip(row) {
                    if info.column_bytes(*column) == 4 {
                        stream.extend(value.to_le_bytes());
                    } else {
                        #[allow(clippy::cast_possible_truncation)]
                        stream.extend((*value as u16).to_le_bytes());
                    }
                }
            }
        }

        align(&mut stream, 4);
        stream
    }

    /// Every row of every table in `TableId` order, coded indexes already encoded.
    fn rows(&self, rvas: &[u32]) -> Vec<(TableId, Vec<Vec<u32>>)> {
        use CodedIndexType as C;

        let mut rows = Vec::new();

        rows.push((TableId::Module, vec![vec![0, self.name, 1, 0, 0]]));

        rows.push((
            TableId::TypeRef,
            self.type_refs
                .iter()
                .map(|(scope, name, namespace)| {
                    vec![coded(C::ResolutionScope, *scope), *name, *namespace]
                })
                .collect(),
        ));

        rows.push((
            TableId::TypeDef,
            self.type_defs
                .iter()
                .zip(1_u32..)
                .map(|(typedef, rid)| {
                    vec![
                        typedef.flags,
                        typedef.name,
                        typedef.namespace,
                        coded(C::TypeDefOrRef, typedef.extends),
                        first_of(self.fields.iter().map(|field| field.owner), rid),
                        first_of(self.methods.iter().map(|method| method.owner), rid),
                    ]
                })
                .collect(),
        ));

        rows.push((
            TableId::Field,
            self.fields
                .iter()
                .map(|field| vec![u32::from(FIELD_FLAGS), field.name, field.signature])
                .collect(),
        ));

        rows.push((
            TableId::MethodDef,
            self.methods
                .iter()
                .zip(rvas)
                .map(|(method, rva)| {
                    vec![
                        *rva,
                        u32::from(method.impl_flags),
                        u32::from(method.flags),
                        method.name,
                        method.signature,
                        1,
                    ]
                })
                .collect(),
        ));

        let mut interface_impls = self.interface_impls.clone();
        interface_impls.sort_by_key(|(class, _)| *class);
        rows.push((
            TableId::InterfaceImpl,
            interface_impls
                .iter()
                .map(|(class, interface)| vec![*class, coded(C::TypeDefOrRef, *interface)])
                .collect(),
        ));

        rows.push((
            TableId::MemberRef,
            self.member_refs
                .iter()
                .map(|(parent, name, signature)| {
                    vec![coded(C::MemberRefParent, *parent), *name, *signature]
                })
                .collect(),
        ));

        let mut attributes: Vec<Vec<u32>> = self
            .custom_attributes
            .iter()
            .map(|(parent, constructor, value)| {
                vec![
                    coded(C::HasCustomAttribute, *parent),
                    coded(C::CustomAttributeType, *constructor),
                    *value,
                ]
            })
            .collect();
        attributes.sort_by_key(|row| row[0]);
        rows.push((TableId::CustomAttribute, attributes));

        rows.push((
            TableId::EventMap,
            member_map(self.events.iter().map(|(event, _)| event.owner)),
        ));
        rows.push((
            TableId::Event,
            self.events
                .iter()
                .map(|(event, event_type)| vec![0, event.name, coded(C::TypeDefOrRef, *event_type)])
                .collect(),
        ));

        rows.push((
            TableId::PropertyMap,
            member_map(self.properties.iter().map(|property| property.owner)),
        ));
        rows.push((
            TableId::Property,
            self.properties
                .iter()
                .map(|property| vec![0, property.name, property.value])
                .collect(),
        ));

        let mut semantics: Vec<Vec<u32>> = self
            .semantics
            .iter()
            .map(|(flags, method, association)| {
                vec![u32::from(*flags), *method, coded(C::HasSemantics, *association)]
            })
            .collect();
        semantics.sort_by_key(|row| row[2]);
        rows.push((TableId::MethodSemantics, semantics));

        let mut method_impls = self.method_impls.clone();
        method_impls.sort_by_key(|(class, _, _)| *class);
        rows.push((
            TableId::MethodImpl,
            method_impls
                .iter()
                .map(|(class, body, declaration)| {
                    vec![
                        *class,
                        coded(C::MethodDefOrRef, *body),
                        coded(C::MethodDefOrRef, *declaration),
                    ]
                })
                .collect(),
        ));

        rows.push((
            TableId::TypeSpec,
            self.type_specs.iter().map(|blob| vec![*blob]).collect(),
        ));

        if self.with_assembly {
            // SHA1 hash algorithm, version 1.0.0.0
            rows.push((
                TableId::Assembly,
                vec![vec![0x8004, 1, 0, 0, 0, 0, 0, self.name, 0]],
            ));
        }

        rows.push((TableId::AssemblyRef, self.assembly_refs.clone()));

        let mut nested = self.nested.clone();
        nested.sort_by_key(|(nested, _)| *nested);
        rows.push((
            TableId::NestedClass,
            nested
                .iter()
                .map(|(nested, enclosing)| vec![*nested, *enclosing])
                .collect(),
        ));

        rows
    }
}

/// Encodes `token` as a coded index of kind `kind`.
fn coded(kind: CodedIndexType, token: Token) -> u32 {
    let tag = match kind {
        CodedIndexType::CustomAttributeType if token.is(TableId::MemberRef) => 3,
        CodedIndexType::CustomAttributeType => 2,
        _ => kind
            .tables()
            .iter()
            .position(|table| token.is(*table))
            .unwrap_or(0),
    };

    (token.row() << kind.tag_bits()) | len_u32(tag)
}

/// The first row of the run owned by type `rid`, given the owners of all rows in order.
fn first_of(owners: impl Iterator<Item = u32>, rid: u32) -> u32 {
    len_u32(owners.filter(|owner| *owner < rid).count()) + 1
}

/// `PropertyMap`/`EventMap` rows for members with the given owners, in order.
fn member_map(owners: impl Iterator<Item = u32>) -> Vec<Vec<u32>> {
    let mut rows: Vec<Vec<u32>> = Vec::new();
    for (owner, rid) in owners.zip(1_u32..) {
        if rows.last().is_none_or(|row| row[0] != owner) {
            rows.push(vec![owner, rid]);
        }
    }
    rows
}

fn assert_in_order(last: Option<u32>, owner: u32) {
    assert!(
        last.is_none_or(|last| last <= owner),
        "members of type {owner} added after those of type {last:?}"
    );
}

fn method_body(code: &[u8], catches: &[Token]) -> Vec<u8> {
    if catches.is_empty() && code.len() < 64 {
        let mut body = vec![(len_u8(code.len()) << 2) | 0x02];
        body.extend_from_slice(code);
        return body;
    }

    let flags: u16 = if catches.is_empty() { 0x3003 } else { 0x300B };
    let mut body = Vec::with_capacity(12 + code.len());
    body.extend(flags.to_le_bytes());
    body.extend(8_u16.to_le_bytes());
    body.extend(len_u32(code.len()).to_le_bytes());
    body.extend(0_u32.to_le_bytes());
    body.extend_from_slice(code);

    if !catches.is_empty() {
        align(&mut body, 4);
        body.push(0x01);
        body.push(len_u8(4 + 12 * catches.len()));
        body.extend([0, 0]);

        let length = len_u8(code.len());
        for class in catches {
            body.extend(0_u16.to_le_bytes());
            body.extend(0_u16.to_le_bytes());
            body.push(length);
            body.extend(0_u16.to_le_bytes());
            body.push(length);
            body.extend(class.value().to_le_bytes());
        }
    }

    body
}

/// Wraps `text` into a PE32 DLL as its only section.
fn pe_image(text: &[u8]) -> Vec<u8> {
    let virtual_size = len_u32(text.len());
    let raw_size = virtual_size.div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT;
    let image_size = SECTION_RVA + virtual_size.div_ceil(SECTION_ALIGNMENT) * SECTION_ALIGNMENT;

    let mut image = vec![0_u8; PE_OFFSET];
    image[0..2].copy_from_slice(b"MZ");
    image[0x3C..0x40].copy_from_slice(&len_u32(PE_OFFSET).to_le_bytes());

    image.extend(b"PE\0\0");
    // COFF: i386, one section, 224-byte optional header, DLL | 32BIT | EXECUTABLE
    image.extend(0x014C_u16.to_le_bytes());
    image.extend(1_u16.to_le_bytes());
    image.extend([0; 12]);
    image.extend(0x00E0_u16.to_le_bytes());
    image.extend(0x2102_u16.to_le_bytes());

    // standard fields
    image.extend(0x010B_u16.to_le_bytes());
    image.extend([48, 0]);
    image.extend(raw_size.to_le_bytes());
    image.extend(0_u32.to_le_bytes());
    image.extend(0_u32.to_le_bytes());
    image.extend(0_u32.to_le_bytes());
    image.extend(SECTION_RVA.to_le_bytes());
    image.extend(0_u32.to_le_bytes());

    // Windows fields
    image.extend(0x1000_0000_u32.to_le_bytes());
    image.extend(SECTION_ALIGNMENT.to_le_bytes());
    image.extend(FILE_ALIGNMENT.to_le_bytes());
    for version in [4_u16, 0, 0, 0, 4, 0] {
        image.extend(version.to_le_bytes());
    }
    image.extend(0_u32.to_le_bytes());
    image.extend(image_size.to_le_bytes());
    image.extend(FILE_ALIGNMENT.to_le_bytes());
    image.extend(0_u32.to_le_bytes());
    image.extend(3_u16.to_le_bytes());
    image.extend(0x8540_u16.to_le_bytes());
    for size in [0x0010_0000_u32, 0x1000, 0x0010_0000, 0x1000] {
        image.extend(size.to_le_bytes());
    }
    image.extend(0_u32.to_le_bytes());
    image.extend(16_u32.to_le_bytes());

    // data directories, only the CLR runtime header (14) is present
    for index in 0..16 {
        if index == 14 {
            image.extend(SECTION_RVA.to_le_bytes());
            image.extend(len_u32(Cor20Header::SIZE).to_le_bytes());
        } else {
            image.extend([0; 8]);
        }
    }

    image.extend(b".text\0\0\0");
    image.extend(virtual_size.to_le_bytes());
    image.extend(SECTION_RVA.to_le_bytes());
    image.extend(raw_size.to_le_bytes());
    image.extend(FILE_ALIGNMENT.to_le_bytes());
    image.extend([0; 12]);
    // CODE | EXECUTE | READ
    image.extend(0x6000_0020_u32.to_le_bytes());

    image.resize(FILE_ALIGNMENT as usize, 0);
    image.extend_from_slice(text);
    image.resize(FILE_ALIGNMENT as usize + raw_size as usize, 0);
    image
}

fn compressed_uint(data: &mut Vec<u8>, value: u32) {
    #[allow(clippy::cast_possible_truncation)]
    match value {
        0..=0x7F => data.push(value as u8),
        0x80..=0x3FFF => data.extend((value as u16 | 0x8000).to_be_bytes()),
        _ => data.extend((value | 0xC000_0000).to_be_bytes()),
    }
}

fn align(data: &mut Vec<u8>, alignment: usize) {
    data.resize(data.len().div_ceil(alignment) * alignment, 0);
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn len_u8(len: usize) -> u8 {
    u8::try_from(len).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        reader::ModuleReader,
        tables::{MemberRefRaw, TypeDefRaw, TypeRefRaw},
    };

    #[test]
    fn heaps_intern() {
        let mut heap = Heap::new();
        assert_eq!(heap.string(""), 0);
        assert_eq!(heap.string("Object"), 1);
        assert_eq!(heap.string("System"), 8);
        assert_eq!(heap.string("Object"), 1);

        let mut blobs = Heap::new();
        assert_eq!(blobs.blob(&[0x06, 0x08]), 1);
        assert_eq!(blobs.blob(&[0x06, 0x08]), 1);
        assert_eq!(blobs.data, [0x00, 0x02, 0x06, 0x08]);
    }

    #[test]
    fn coded_indexes() {
        let typeref = Token::from_parts(TableId::TypeRef, 5);
        assert_eq!(coded(CodedIndexType::TypeDefOrRef, typeref), 0x15);
        assert_eq!(coded(CodedIndexType::TypeDefOrRef, Token::default()), 0);

        let memberref = Token::from_parts(TableId::MemberRef, 5);
        assert_eq!(coded(CodedIndexType::CustomAttributeType, memberref), 0x2B);
        let method = Token::from_parts(TableId::MethodDef, 1);
        assert_eq!(coded(CodedIndexType::CustomAttributeType, method), 0x0A);
    }

    #[test]
    fn member_runs() {
        assert_eq!(first_of([2, 2, 4].into_iter(), 1), 1);
        assert_eq!(first_of([2, 2, 4].into_iter(), 3), 3);
        assert_eq!(first_of([2, 2, 4].into_iter(), 5), 4);
        assert_eq!(member_map([2, 2, 4].into_iter()), [vec![2, 1], vec![4, 3]]);
    }

    #[test]
    #[should_panic(expected = "added after")]
    fn members_out_of_order() {
        let mut builder = ModuleBuilder::new("Sample");
        let object = builder.type_ref("System", "Object");
        let first = builder.type_def("Lib", "A", object);
        let second = builder.type_def("Lib", "B", object);
        builder.field(second, "b", &[0x06, 0x08]);
        builder.field(first, "a", &[0x06, 0x08]);
    }

    #[test]
    fn fat_bodies() {
        let catch = Token::from_parts(TableId::TypeRef, 2);
        let body = method_body(&[0x2A], &[catch]);
        assert_eq!(&body[..2], &0x300B_u16.to_le_bytes());
        // header 12, code 1, padding 3, section header 4, one clause 12
        assert_eq!(body.len(), 32);
        assert_eq!(body[16], 0x01);
        assert_eq!(body[17], 16);

        let long = vec![0x00; 70];
        assert_eq!(method_body(&long, &[]).len(), 82);
    }

    #[test]
    fn written_rows_read_back() {
        let mut builder = ModuleBuilder::new("Sample");
        let object = builder.type_ref("System", "Object");
        let disposable = builder.type_ref("System", "IDisposable");
        let class = builder.type_def("Lib", "Resource", object);
        builder.interface_impl(class, disposable);
        let dispose = builder.member_ref(disposable, "Dispose", &[0x20, 0x00, 0x01]);
        let method = builder.method(class, "Dispose", &[0x20, 0x00, 0x01], Some(&[0x00; 80]));
        builder.catch_clause(method, object);

        let reader = ModuleReader::open(builder.build()).unwrap();

        let typeref = reader.row::<TypeRefRaw>(object.row()).unwrap();
        assert_eq!(typeref.resolution_scope.tag, TableId::AssemblyRef);
        assert_eq!(reader.string(typeref.type_namespace).unwrap(), "System");

        let typedef = reader.row::<TypeDefRaw>(class).unwrap();
        assert_eq!(typedef.extends.token, object);
        let interfaces = reader.interfaces_of(class).unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].interface.token, disposable);

        let memberref = reader.row::<MemberRefRaw>(dispose.row()).unwrap();
        assert_eq!(memberref.class.token, disposable);

        let methods = reader.methods(&typedef).unwrap();
        let body = reader.method_body(&methods[0]).unwrap();
        assert_eq!(body.code.len(), 80);
        assert_eq!(body.exception_handlers.len(), 1);
        assert_eq!(body.exception_handlers[0].class_token(), Some(object));
    }
}
