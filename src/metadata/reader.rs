//! The module reader: one opened managed module.
//!
//! [`ModuleReader`] owns the image bytes, validates that they hold an assembly, and gives
//! typed access to the metadata tables, the heaps and the method bodies. Rows are decoded on
//! demand; the only state built up front are the reverse indexes that the tables don't
//! provide directly (custom attributes by parent, nested types by enclosing type, accessors by
//! property or event, and so on).
//!
//! # Examples
//!
//! ```rust,no_run
//! use usagescope::metadata::reader::ModuleReader;
//!
//! let reader = ModuleReader::from_file("Newtonsoft.Json.dll".as_ref())?;
//! for typeref in reader.type_refs().rows() {
//!     let typeref = typeref?;
//!     println!("{}", reader.string(typeref.type_name)?);
//! }
//! # Ok::<(), usagescope::Error>(())
//! ```

use std::{collections::HashMap, ops::Range, path::Path};

use crate::{
    disassembler::Instructions,
    file::{Backend, File, Memory},
    metadata::{
        cor20header::Cor20Header,
        diagnostics::{DiagnosticCategory, Diagnostics},
        method::MethodBody,
        root::Root,
        streams::{Blob, Guid, Strings, TablesHeader},
        tables::{
            AssemblyRaw, AssemblyRefRaw, CustomAttributeRaw, EventMapRaw, EventPtrRaw, EventRaw,
            FieldPtrRaw, FieldRaw, InterfaceImplRaw, MemberRefRaw, MetadataTable,
            MethodDefRaw, MethodImplRaw, MethodPtrRaw, MethodSemanticsAttributes,
            MethodSemanticsRaw, NestedClassRaw, PropertyMapRaw, PropertyPtrRaw, PropertyRaw,
            RowReadable, TableId, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
        },
        token::Token,
    },
    Error, Result,
};

/// The accessor methods of a property, as `MethodDef` rows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PropertyAccessors {
    /// The getter.
    pub getter: Option<u32>,
    /// The setter.
    pub setter: Option<u32>,
    /// Every other accessor.
    pub others: Vec<u32>,
}

impl PropertyAccessors {
    /// All accessors: getter, setter, then the others.
    pub fn all(&self) -> impl Iterator<Item = u32> + '_ {
        self.getter
            .into_iter()
            .chain(self.setter)
            .chain(self.others.iter().copied())
    }
}

/// The accessor methods of an event, as `MethodDef` rows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventAccessors {
    /// The `add` accessor.
    pub adder: Option<u32>,
    /// The `remove` accessor.
    pub remover: Option<u32>,
    /// The `raise` accessor.
    pub raiser: Option<u32>,
    /// Every other accessor.
    pub others: Vec<u32>,
}

impl EventAccessors {
    /// All accessors: adder, remover, raiser, then the others.
    pub fn all(&self) -> impl Iterator<Item = u32> + '_ {
        self.adder
            .into_iter()
            .chain(self.remover)
            .chain(self.raiser)
            .chain(self.others.iter().copied())
    }
}

/// Reverse lookups built once when a module is opened.
#[derive(Default)]
struct Indexes {
    custom_attributes: HashMap<Token, Vec<u32>>,
    nested_types: HashMap<u32, Vec<u32>>,
    enclosing_type: HashMap<u32, u32>,
    semantics: HashMap<Token, Vec<u32>>,
    interface_impls: HashMap<u32, Vec<u32>>,
    method_impls: HashMap<u32, Vec<u32>>,
    property_ranges: HashMap<u32, Range<u32>>,
    event_ranges: HashMap<u32, Range<u32>>,
}

/// An opened managed module.
///
/// The reader exclusively owns its backend; dropping it releases the buffer or the mapping.
/// It is `Send`, so a module can be opened on one thread and crawled on another.
pub struct ModuleReader {
    file: File,
    cor20: Cor20Header,
    root: Root,
    tables: TablesHeader,
    tables_range: Range<usize>,
    strings_range: Range<usize>,
    blob_range: Range<usize>,
    guid_range: Range<usize>,
    indexes: Indexes,
    diagnostics: Diagnostics,
}

impl ModuleReader {
    /// Opens a module held in memory, returning why it isn't one on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes aren't a PE image with a CLR header, the metadata is
    /// damaged, or the metadata doesn't declare an assembly.
    pub fn open(data: Vec<u8>) -> Result<ModuleReader> {
        Self::from_backend(Memory::new(data))
    }

    /// Opens a module held in memory, `None` if the bytes aren't a managed assembly.
    ///
    /// The reason is logged at debug level.
    #[must_use]
    pub fn try_open(data: Vec<u8>) -> Option<ModuleReader> {
        match Self::open(data) {
            Ok(reader) => Some(reader),
            Err(error) => {
                log::debug!("Not a managed module: {error}");
                None
            }
        }
    }

    /// Opens a module from disk. The file is memory-mapped.
    ///
    /// # Errors
    ///
    /// Same as [`ModuleReader::open`], plus I/O errors.
    pub fn from_file(path: &Path) -> Result<ModuleReader> {
        Self::from_parts(File::from_file(path)?)
    }

    /// Opens a module from any [`Backend`].
    ///
    /// # Errors
    ///
    /// Same as [`ModuleReader::open`].
    pub fn from_backend<T: Backend + 'static>(backend: T) -> Result<ModuleReader> {
        Self::from_parts(File::from_backend(backend)?)
    }

    fn from_parts(file: File) -> Result<ModuleReader> {
        let (clr_rva, clr_size) = file.clr();
        let clr_offset = file.rva_to_offset(clr_rva)?;
        let cor20 = Cor20Header::read(file.data_slice(clr_offset, clr_size)?)?;

        let meta_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
        let meta_size = cor20.meta_data_size as usize;
        let root = Root::read(file.data_slice(meta_offset, meta_size)?)?;

        let stream_range = |name: &str| {
            root.stream(name).map(|header| {
                let start = meta_offset + header.offset as usize;
                start..start + header.size as usize
            })
        };

        let Some(tables_range) = stream_range("#~").or_else(|| stream_range("#-")) else {
            return Err(Error::NotAModule("no tables stream".to_string()));
        };
        let Some(strings_range) = stream_range("#Strings") else {
            return Err(Error::NotAModule("no #Strings stream".to_string()));
        };
        let blob_range = stream_range("#Blob").unwrap_or(0..0);
        let guid_range = stream_range("#GUID").unwrap_or(0..0);

        let tables = TablesHeader::from(
            file.data_slice(tables_range.start, tables_range.len())?,
        )?;

        if tables.row_count(TableId::Assembly) == 0 {
            return Err(Error::NotAModule("no Assembly row".to_string()));
        }

        let mut reader = ModuleReader {
            file,
            cor20,
            root,
            tables,
            tables_range,
            strings_range,
            blob_range,
            guid_range,
            indexes: Indexes::default(),
            diagnostics: Diagnostics::new(),
        };
        reader.indexes = reader.build_indexes()?;

        Ok(reader)
    }

    fn build_indexes(&self) -> Result<Indexes> {
        let mut indexes = Indexes::default();

        for attribute in self.table::<CustomAttributeRaw>().iter() {
            let attribute = attribute?;
            indexes
                .custom_attributes
                .entry(attribute.parent.token)
                .or_default()
                .push(attribute.rid);
        }

        for nested in self.table::<NestedClassRaw>().iter() {
            let nested = nested?;
            indexes
                .nested_types
                .entry(nested.enclosing_class)
                .or_default()
                .push(nested.nested_class);
            indexes
                .enclosing_type
                .insert(nested.nested_class, nested.enclosing_class);
        }

        for semantics in self.table::<MethodSemanticsRaw>().iter() {
            let semantics = semantics?;
            indexes
                .semantics
                .entry(semantics.association.token)
                .or_default()
                .push(semantics.rid);
        }

        for implementation in self.table::<InterfaceImplRaw>().iter() {
            let implementation = implementation?;
            indexes
                .interface_impls
                .entry(implementation.class)
                .or_default()
                .push(implementation.rid);
        }

        for implementation in self.table::<MethodImplRaw>().iter() {
            let implementation = implementation?;
            indexes
                .method_impls
                .entry(implementation.class)
                .or_default()
                .push(implementation.rid);
        }

        let property_end = self.list_len(TableId::PropertyPtr, TableId::Property) + 1;
        let maps = self.table::<PropertyMapRaw>();
        for rid in 1..=maps.row_count() {
            let map = maps.get(rid)?;
            let end = if rid < maps.row_count() {
                maps.get(rid + 1)?.property_list
            } else {
                property_end
            };
            indexes
                .property_ranges
                .insert(map.parent, clamp(map.property_list..end, property_end));
        }

        let event_end = self.list_len(TableId::EventPtr, TableId::Event) + 1;
        let maps = self.table::<EventMapRaw>();
        for rid in 1..=maps.row_count() {
            let map = maps.get(rid)?;
            let end = if rid < maps.row_count() {
                maps.get(rid + 1)?.event_list
            } else {
                event_end
            };
            indexes
                .event_ranges
                .insert(map.parent, clamp(map.event_list..end, event_end));
        }

        Ok(indexes)
    }

    /// Number of logical entries of a list column: the `*Ptr` table if present, else the table.
    fn list_len(&self, ptr: TableId, table: TableId) -> u32 {
        match self.tables.row_count(ptr) {
            0 => self.tables.row_count(table),
            rows => rows,
        }
    }

    fn stream(&self, range: &Range<usize>) -> &[u8] {
        self.file.data().get(range.clone()).unwrap_or(&[])
    }

    /// The CLR runtime header.
    #[must_use]
    pub fn cor20(&self) -> &Cor20Header {
        &self.cor20
    }

    /// The metadata root (version string and stream directory).
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The `#~` header: row counts and index widths.
    #[must_use]
    pub fn tables(&self) -> &TablesHeader {
        &self.tables
    }

    /// The `#Strings` heap.
    #[must_use]
    pub fn strings(&self) -> Strings<'_> {
        Strings::from(self.stream(&self.strings_range))
    }

    /// The `#Blob` heap, empty if the module has none.
    #[must_use]
    pub fn blobs(&self) -> Blob<'_> {
        Blob::from(self.stream(&self.blob_range))
    }

    /// The `#GUID` heap, empty if the module has none.
    #[must_use]
    pub fn guids(&self) -> Guid<'_> {
        Guid::from(self.stream(&self.guid_range))
    }

    /// Reads a string from `#Strings`.
    ///
    /// # Errors
    ///
    /// Returns an error for an index outside of the heap or invalid UTF-8.
    pub fn string(&self, index: u32) -> Result<&str> {
        self.strings().get(index as usize)
    }

    /// Reads a blob from `#Blob`.
    ///
    /// # Errors
    ///
    /// Returns an error for an index outside of the heap or a truncated blob.
    pub fn blob(&self, index: u32) -> Result<&[u8]> {
        self.blobs().get(index as usize)
    }

    /// A typed view of table `T`; empty if the table is absent.
    #[must_use]
    pub fn table<T: RowReadable>(&self) -> MetadataTable<'_, T> {
        self.tables.table::<T>(self.stream(&self.tables_range))
    }

    /// Reads one row of table `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not exist or is malformed.
    pub fn row<T: RowReadable>(&self, rid: u32) -> Result<T> {
        self.table::<T>().get(rid)
    }

    /// Non-fatal anomalies found so far.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The single row of the `Assembly` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is malformed.
    pub fn assembly(&self) -> Result<AssemblyRaw> {
        self.row::<AssemblyRaw>(1)
    }

    /// All type definitions, nested ones included, in table order.
    #[must_use]
    pub fn type_defs(&self) -> MetadataTable<'_, TypeDefRaw> {
        self.table()
    }

    /// All type references.
    #[must_use]
    pub fn type_refs(&self) -> MetadataTable<'_, TypeRefRaw> {
        self.table()
    }

    /// All member references.
    #[must_use]
    pub fn member_refs(&self) -> MetadataTable<'_, MemberRefRaw> {
        self.table()
    }

    /// All type specifications.
    #[must_use]
    pub fn type_specs(&self) -> MetadataTable<'_, TypeSpecRaw> {
        self.table()
    }

    /// All assembly references.
    #[must_use]
    pub fn assembly_refs(&self) -> MetadataTable<'_, AssemblyRefRaw> {
        self.table()
    }

    /// All method definitions.
    #[must_use]
    pub fn method_defs(&self) -> MetadataTable<'_, MethodDefRaw> {
        self.table()
    }

    /// All method implementations (explicit overrides).
    #[must_use]
    pub fn method_impls(&self) -> MetadataTable<'_, MethodImplRaw> {
        self.table()
    }

    /// All interface implementations.
    #[must_use]
    pub fn interface_impls(&self) -> MetadataTable<'_, InterfaceImplRaw> {
        self.table()
    }

    /// Resolves a run `[start, end)` of a list column of `typedef` against the next row.
    fn type_list(&self, typedef: &TypeDefRaw, ptr: TableId, table: TableId) -> Result<Range<u32>> {
        let list_end = self.list_len(ptr, table) + 1;
        let start = |row: &TypeDefRaw| {
            if table == TableId::Field {
                row.field_list
            } else {
                row.method_list
            }
        };

        let end = if typedef.rid < self.tables.row_count(TableId::TypeDef) {
            start(&self.row::<TypeDefRaw>(typedef.rid + 1)?)
        } else {
            list_end
        };

        Ok(clamp(start(typedef)..end, list_end))
    }

    /// The fields declared by `typedef`, following `FieldPtr` when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a row of the run is malformed.
    pub fn fields(&self, typedef: &TypeDefRaw) -> Result<Vec<FieldRaw>> {
        let indirect = self.tables.row_count(TableId::FieldPtr) > 0;

        self.type_list(typedef, TableId::FieldPtr, TableId::Field)?
            .map(|index| {
                let rid = if indirect {
                    self.row::<FieldPtrRaw>(index)?.field
                } else {
                    index
                };
                self.row::<FieldRaw>(rid)
            })
            .collect()
    }

    /// The methods declared by `typedef`, following `MethodPtr` when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a row of the run is malformed.
    pub fn methods(&self, typedef: &TypeDefRaw) -> Result<Vec<MethodDefRaw>> {
        let indirect = self.tables.row_count(TableId::MethodPtr) > 0;

        self.type_list(typedef, TableId::MethodPtr, TableId::MethodDef)?
            .map(|index| {
                let rid = if indirect {
                    self.row::<MethodPtrRaw>(index)?.method
                } else {
                    index
                };
                self.row::<MethodDefRaw>(rid)
            })
            .collect()
    }

    /// The properties declared by `typedef`.
    ///
    /// # Errors
    ///
    /// Returns an error if a row of the run is malformed.
    pub fn properties(&self, typedef: &TypeDefRaw) -> Result<Vec<PropertyRaw>> {
        let Some(range) = self.indexes.property_ranges.get(&typedef.rid) else {
            return Ok(Vec::new());
        };
        let indirect = self.tables.row_count(TableId::PropertyPtr) > 0;

        range
            .clone()
            .map(|index| {
                let rid = if indirect {
                    self.row::<PropertyPtrRaw>(index)?.property
                } else {
                    index
                };
                self.row::<PropertyRaw>(rid)
            })
            .collect()
    }

    /// The events declared by `typedef`.
    ///
    /// # Errors
    ///
    /// Returns an error if a row of the run is malformed.
    pub fn events(&self, typedef: &TypeDefRaw) -> Result<Vec<EventRaw>> {
        let Some(range) = self.indexes.event_ranges.get(&typedef.rid) else {
            return Ok(Vec::new());
        };
        let indirect = self.tables.row_count(TableId::EventPtr) > 0;

        range
            .clone()
            .map(|index| {
                let rid = if indirect {
                    self.row::<EventPtrRaw>(index)?.event
                } else {
                    index
                };
                self.row::<EventRaw>(rid)
            })
            .collect()
    }

    /// The `TypeDef` rows nested directly inside `typedef`.
    #[must_use]
    pub fn nested_types(&self, typedef: u32) -> &[u32] {
        self.indexes
            .nested_types
            .get(&typedef)
            .map_or(&[], Vec::as_slice)
    }

    /// The `TypeDef` row enclosing `typedef`, `None` for top-level types.
    #[must_use]
    pub fn declaring_type(&self, typedef: u32) -> Option<u32> {
        self.indexes.enclosing_type.get(&typedef).copied()
    }

    /// The `InterfaceImpl` rows of `typedef`.
    ///
    /// # Errors
    ///
    /// Returns an error if a row is malformed.
    pub fn interfaces_of(&self, typedef: u32) -> Result<Vec<InterfaceImplRaw>> {
        self.indexes
            .interface_impls
            .get(&typedef)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|rid| self.row::<InterfaceImplRaw>(*rid))
            .collect()
    }

    /// The `MethodImpl` rows of `typedef`.
    ///
    /// # Errors
    ///
    /// Returns an error if a row is malformed.
    pub fn method_impls_of(&self, typedef: u32) -> Result<Vec<MethodImplRaw>> {
        self.indexes
            .method_impls
            .get(&typedef)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|rid| self.row::<MethodImplRaw>(*rid))
            .collect()
    }

    fn semantics_of(&self, association: Token) -> Result<Vec<MethodSemanticsRaw>> {
        self.indexes
            .semantics
            .get(&association)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|rid| self.row::<MethodSemanticsRaw>(*rid))
            .collect()
    }

    /// The accessors of a property.
    ///
    /// # Errors
    ///
    /// Returns an error if a `MethodSemantics` row is malformed.
    pub fn property_accessors(&self, property: &PropertyRaw) -> Result<PropertyAccessors> {
        let mut accessors = PropertyAccessors::default();

        for semantics in self.semantics_of(property.token)? {
            if semantics.semantics.contains(MethodSemanticsAttributes::GETTER) {
                accessors.getter = Some(semantics.method);
            } else if semantics.semantics.contains(MethodSemanticsAttributes::SETTER) {
                accessors.setter = Some(semantics.method);
            } else if semantics.semantics.contains(MethodSemanticsAttributes::OTHER) {
                accessors.others.push(semantics.method);
            }
        }

        Ok(accessors)
    }

    /// The accessors of an event.
    ///
    /// # Errors
    ///
    /// Returns an error if a `MethodSemantics` row is malformed.
    pub fn event_accessors(&self, event: &EventRaw) -> Result<EventAccessors> {
        let mut accessors = EventAccessors::default();

        for semantics in self.semantics_of(event.token)? {
            if semantics.semantics.contains(MethodSemanticsAttributes::ADD_ON) {
                accessors.adder = Some(semantics.method);
            } else if semantics.semantics.contains(MethodSemanticsAttributes::REMOVE_ON) {
                accessors.remover = Some(semantics.method);
            } else if semantics.semantics.contains(MethodSemanticsAttributes::FIRE) {
                accessors.raiser = Some(semantics.method);
            } else if semantics.semantics.contains(MethodSemanticsAttributes::OTHER) {
                accessors.others.push(semantics.method);
            }
        }

        Ok(accessors)
    }

    /// The custom attributes attached to `parent`, in table order.
    ///
    /// # Errors
    ///
    /// Returns an error if a `CustomAttribute` row is malformed.
    pub fn custom_attributes(&self, parent: Token) -> Result<Vec<CustomAttributeRaw>> {
        self.indexes
            .custom_attributes
            .get(&parent)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|rid| self.row::<CustomAttributeRaw>(*rid))
            .collect()
    }

    /// The decoded body of `method`, `None` if it has none or it doesn't decode.
    ///
    /// Abstract and extern methods (RVA 0) and runtime, internal-call, unmanaged, native or
    /// OPTIL implementations have no IL body. A body that fails to decode is recorded in
    /// [`ModuleReader::diagnostics`] and treated as absent.
    #[must_use]
    pub fn method_body(&self, method: &MethodDefRaw) -> Option<MethodBody<'_>> {
        if method.rva == 0 || !method.impl_attributes().has_il_body() {
            return None;
        }

        let body = self
            .file
            .rva_to_offset(method.rva as usize)
            .and_then(|offset| {
                let data = self.file.data();
                let rest = data.get(offset..).ok_or_else(|| out_of_bounds_error!())?;
                MethodBody::from(rest)
            });

        contain!(
            self.diagnostics,
            DiagnosticCategory::MethodBody,
            body.map_err(|error| malformed_error!("{}: {}", method.token, error))
        )
    }

    /// The instruction stream of `method`; empty if it has no body.
    #[must_use]
    pub fn instructions(&self, method: &MethodDefRaw) -> Instructions<'_> {
        match self.method_body(method) {
            Some(body) => Instructions::new(body.code),
            None => Instructions::new(&[]),
        }
    }
}

fn clamp(range: Range<u32>, end: u32) -> Range<u32> {
    let start = range.start.clamp(1, end);
    start..range.end.clamp(start, end)
}
