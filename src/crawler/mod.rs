//! The module crawler: every API a module references, as documentation IDs.
//!
//! [`AssemblyCrawler`] walks the metadata graph of one [`ModuleReader`]: the member and type
//! reference tables, then every type definition with its attributes, fields, properties and
//! events. Signatures are decoded with a recording [`SignatureTypeProvider`] so that types that
//! only appear inside generic instantiations, arrays or function pointers are found as well.
//! Named arguments of custom attributes contribute `F:` and `P:` keys for the fields and
//! properties they set.
//!
//! Only entities that resolve outside of the module produce keys. Method bodies are not
//! inspected; every call site's target already has a row in the `MemberRef` table.
//!
//! # Example
//!
//! ```rust,no_run
//! use usagescope::crawler::{AssemblyContext, AssemblyCrawler};
//! use usagescope::metadata::reader::ModuleReader;
//!
//! let reader = ModuleReader::from_file("Newtonsoft.Json.dll".as_ref())?;
//! let results = AssemblyCrawler::new().crawl(&reader, &AssemblyContext::default())?;
//! for key in results.into_sorted_vec() {
//!     println!("{key}");
//! }
//! # Ok::<(), usagescope::Error>(())
//! ```
//!
//! [`SignatureTypeProvider`]: crate::metadata::signatures::SignatureTypeProvider

mod apikey;
mod context;
mod framework;
mod guard;
mod results;
mod walker;

pub use apikey::{ApiKey, ApiKind};
pub use context::AssemblyContext;
pub use framework::{FrameworkIdentifier, FrameworkVersion, TargetFramework};
pub use results::CrawlerResults;

use std::{cell::Cell, collections::HashSet, fmt, sync::Arc};

use crate::{
    crawler::{guard::DepthGuard, walker::SignatureWalker},
    metadata::{
        customattributes::{EnumResolver, NamedArgumentKind, NamedArguments},
        naming::{is_named, member_ref_doc_id, type_ref_doc_id, type_ref_name},
        reader::ModuleReader,
        signatures::SignatureDecoder,
        tables::{
            EventRaw, FieldRaw, MemberRefRaw, PropertyRaw, TableId, TypeDefRaw, TypeRefRaw,
            TypeSpecRaw,
        },
        token::Token,
    },
    Result,
};

/// Default ceiling of nested field, property, event and entity visits.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Settings of an [`AssemblyCrawler`].
#[derive(Clone)]
pub struct CrawlOptions {
    /// Nesting ceiling; a module that needs more fails with [`crate::Error::RecursionLimit`].
    pub max_depth: usize,
    /// Resolves enum types used in attribute arguments. Without one, attributes with enum
    /// arguments only contribute the named arguments before the first enum.
    pub resolver: Option<Arc<dyn EnumResolver>>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        CrawlOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            resolver: None,
        }
    }
}

impl CrawlOptions {
    /// Sets the nesting ceiling.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the enum resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn EnumResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl fmt::Debug for CrawlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlOptions")
            .field("max_depth", &self.max_depth)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Collects the documentation IDs of everything a module references.
///
/// A crawler holds only its options; every [`AssemblyCrawler::crawl`] starts from an empty set,
/// so one crawler may be reused for any number of modules.
#[derive(Debug, Clone, Default)]
pub struct AssemblyCrawler {
    options: CrawlOptions,
}

impl AssemblyCrawler {
    /// A crawler with [`CrawlOptions::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A crawler with the given options.
    #[must_use]
    pub fn with_options(options: CrawlOptions) -> Self {
        AssemblyCrawler { options }
    }

    /// The options in use.
    #[must_use]
    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Crawls one module.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RecursionLimit`] if the metadata nests deeper than
    /// [`CrawlOptions::max_depth`], and a malformed or out-of-bounds error if a row, heap entry,
    /// signature or attribute blob the walk depends on is damaged. No partial results are
    /// returned in either case.
    pub fn crawl(
        &self,
        reader: &ModuleReader,
        context: &AssemblyContext,
    ) -> Result<CrawlerResults> {
        let depth = Cell::new(0);
        let mut crawl = Crawl {
            reader,
            resolver: self.options.resolver.as_deref(),
            depth: &depth,
            max_depth: self.options.max_depth,
            results: HashSet::new(),
        };

        crawl.run()?;

        log::debug!(
            "Crawled {} API keys ({})",
            crawl.results.len(),
            context
                .framework
                .as_ref()
                .map_or_else(|| "unknown framework".to_string(), ToString::to_string)
        );
        Ok(CrawlerResults::new(crawl.results))
    }
}

/// State of one crawl.
pub(crate) struct Crawl<'a> {
    reader: &'a ModuleReader,
    resolver: Option<&'a dyn EnumResolver>,
    depth: &'a Cell<usize>,
    max_depth: usize,
    results: HashSet<ApiKey>,
}

impl<'a> Crawl<'a> {
    fn run(&mut self) -> Result<()> {
        let reader = self.reader;

        self.crawl_attributes(Token::from_parts(TableId::Assembly, 1))?;

        for memberref in reader.member_refs().rows() {
            self.record_member_ref(&memberref?)?;
        }

        for typeref in reader.type_refs().rows() {
            self.record_type_ref(typeref?.rid)?;
        }

        for typedef in reader.type_defs().rows() {
            self.crawl_type(&typedef?)?;
        }

        Ok(())
    }

    fn guard(&self) -> Result<DepthGuard<'a>> {
        DepthGuard::enter(self.depth, self.max_depth)
    }

    /// Adds a key; empty IDs are dropped.
    pub(crate) fn record(&mut self, documentation_id: String) {
        if !documentation_id.is_empty() {
            self.results.insert(ApiKey::new(documentation_id));
        }
    }

    fn crawl_attributes(&mut self, parent: Token) -> Result<()> {
        let reader = self.reader;

        for attribute in reader.custom_attributes(parent)? {
            if attribute.constructor.tag != TableId::MemberRef {
                continue;
            }

            // The constructor itself is recorded from the MemberRef table.
            let constructor = reader.row::<MemberRefRaw>(attribute.constructor.row)?;
            if constructor.class.tag != TableId::TypeRef {
                continue;
            }

            let mut parent_name: Option<Option<String>> = None;
            for argument in NamedArguments::new(reader, &attribute, self.resolver) {
                let argument = argument?;

                if parent_name.is_none() {
                    let typeref = reader.row::<TypeRefRaw>(constructor.class.row)?;
                    parent_name = Some(type_ref_name(reader, &typeref)?);
                }

                let (Some(Some(parent)), Some(name)) = (&parent_name, &argument.name) else {
                    continue;
                };

                let prefix = match argument.kind {
                    NamedArgumentKind::Field => 'F',
                    NamedArgumentKind::Property => 'P',
                };
                self.record(format!("{prefix}:{parent}.{name}"));
            }
        }

        Ok(())
    }

    fn is_ignored(&self, typedef: &TypeDefRaw) -> Result<bool> {
        for attribute in self.reader.custom_attributes(typedef.token)? {
            if is_named(
                self.reader,
                &attribute,
                "Microsoft.CodeAnalysis",
                "EmbeddedAttribute",
                true,
            )? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn crawl_type(&mut self, typedef: &TypeDefRaw) -> Result<()> {
        let reader = self.reader;

        if self.is_ignored(typedef)? {
            return Ok(());
        }

        // Base types and interfaces are recorded from the TypeRef table.
        self.crawl_attributes(typedef.token)?;

        for field in reader.fields(typedef)? {
            self.crawl_field(&field)?;
        }

        for method in reader.methods(typedef)? {
            self.crawl_attributes(method.token)?;
        }

        for property in reader.properties(typedef)? {
            self.crawl_property(&property)?;
        }

        for event in reader.events(typedef)? {
            self.crawl_event(&event)?;
        }

        for nested in reader.nested_types(typedef.rid) {
            let _guard = self.guard()?;
            let nested = reader.row::<TypeDefRaw>(*nested)?;
            self.crawl_type(&nested)?;
        }

        Ok(())
    }

    fn crawl_method(&mut self, rid: Option<u32>) -> Result<()> {
        match rid {
            Some(rid) => self.crawl_attributes(Token::from_parts(TableId::MethodDef, rid)),
            None => Ok(()),
        }
    }

    fn crawl_field(&mut self, field: &FieldRaw) -> Result<()> {
        let reader = self.reader;
        let _guard = self.guard()?;
        self.crawl_attributes(field.token)?;

        let blob = reader.blob(field.signature)?;
        let mut walker = SignatureWalker::new(self);
        SignatureDecoder::new(blob, &mut walker).decode_field_signature()?;
        Ok(())
    }

    fn crawl_property(&mut self, property: &PropertyRaw) -> Result<()> {
        let reader = self.reader;
        let _guard = self.guard()?;
        self.crawl_attributes(property.token)?;

        let blob = reader.blob(property.signature)?;
        let mut walker = SignatureWalker::new(self);
        SignatureDecoder::new(blob, &mut walker).decode_method_signature()?;

        let accessors = reader.property_accessors(property)?;
        self.crawl_method(accessors.getter)?;
        self.crawl_method(accessors.setter)?;
        for other in accessors.others {
            self.crawl_method(Some(other))?;
        }

        Ok(())
    }

    fn crawl_event(&mut self, event: &EventRaw) -> Result<()> {
        let _guard = self.guard()?;
        self.crawl_attributes(event.token)?;
        self.record_entity(Some(event.event_type.token))?;

        let accessors = self.reader.event_accessors(event)?;
        self.crawl_method(accessors.adder)?;
        self.crawl_method(accessors.remover)?;
        for other in accessors.others {
            self.crawl_method(Some(other))?;
        }

        Ok(())
    }

    /// Records whatever `entity` refers to. `None` stands for a shape without a handle and
    /// still counts as a level of nesting.
    pub(crate) fn record_entity(&mut self, entity: Option<Token>) -> Result<()> {
        let _guard = self.guard()?;

        let Some(token) = entity.filter(|token| !token.is_nil()) else {
            return Ok(());
        };

        match token.table_id() {
            Some(TableId::TypeRef) => self.record_type_ref(token.row()),
            Some(TableId::MemberRef) => {
                let memberref = self.reader.row::<MemberRefRaw>(token.row())?;
                self.record_member_ref(&memberref)
            }
            Some(TableId::TypeSpec) => self.record_type_spec(token.row()),
            // Method definitions are local; their attributes are crawled with their type.
            _ => Ok(()),
        }
    }

    pub(crate) fn record_type_ref(&mut self, rid: u32) -> Result<()> {
        let typeref = self.reader.row::<TypeRefRaw>(rid)?;
        if let Some(id) = type_ref_doc_id(self.reader, &typeref)? {
            self.record(id);
        }
        Ok(())
    }

    fn record_member_ref(&mut self, memberref: &MemberRefRaw) -> Result<()> {
        // The parent is recorded from the TypeRef table.
        if memberref.class.tag == TableId::TypeDef {
            return Ok(());
        }

        if let Some(id) = member_ref_doc_id(self.reader, memberref)? {
            self.record(id);
        }
        Ok(())
    }

    fn record_type_spec(&mut self, rid: u32) -> Result<()> {
        let reader = self.reader;
        let typespec = reader.row::<TypeSpecRaw>(rid)?;
        self.crawl_attributes(typespec.token)?;

        let blob = reader.blob(typespec.signature)?;
        let mut walker = SignatureWalker::new(self);
        let leaf = SignatureDecoder::new(blob, &mut walker).decode_type()?;

        if leaf.map_or(true, |token| token.table_id() != Some(TableId::TypeSpec)) {
            self.record_entity(leaf)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::ModuleBuilder;

    fn crawl(bytes: Vec<u8>) -> Result<CrawlerResults> {
        let reader = ModuleReader::open(bytes)?;
        AssemblyCrawler::new().crawl(&reader, &AssemblyContext::default())
    }

    fn sorted(results: CrawlerResults) -> Vec<String> {
        results
            .into_sorted_vec()
            .into_iter()
            .map(|key| key.to_string())
            .collect()
    }

    #[test]
    fn empty_module() {
        let builder = ModuleBuilder::new("Empty");
        assert!(crawl(builder.build()).unwrap().is_empty());
    }

    #[test]
    fn field_signatures_record_their_types() {
        let mut builder = ModuleBuilder::new("Fields");
        let object = builder.type_ref("System", "Object");
        let list = builder.type_ref("System.Collections.Generic", "List`1");
        let owner = builder.type_def("Sample", "Holder", object);

        // List<string>[]
        let signature = [
            0x06, 0x1D, 0x15, 0x12, (list.row() << 2 | 0x01) as u8, 0x01, 0x0E,
        ];
        builder.field(owner, "values", &signature);
        // int32*
        builder.field(owner, "pointer", &[0x06, 0x0F, 0x08]);

        assert_eq!(
            sorted(crawl(builder.build()).unwrap()),
            vec![
                "T:System.Collections.Generic.List`1",
                "T:System.Int32",
                "T:System.Object",
                "T:System.String",
            ]
        );
    }

    #[test]
    fn members_of_local_types_are_skipped() {
        let mut builder = ModuleBuilder::new("Members");
        let object = builder.type_ref("System", "Object");
        let console = builder.type_ref("System", "Console");
        let local = builder.type_def("Sample", "Local", object);

        builder.member_ref(console, "WriteLine", &[0x00, 0x01, 0x01, 0x0E]);
        builder.member_ref(
            Token::from_parts(TableId::TypeDef, local),
            "Helper",
            &[0x00, 0x00, 0x01],
        );

        assert_eq!(
            sorted(crawl(builder.build()).unwrap()),
            vec![
                "M:System.Console.WriteLine(System.String)",
                "T:System.Console",
                "T:System.Object",
            ]
        );
    }

    #[test]
    fn attribute_named_arguments() {
        let mut builder = ModuleBuilder::new("Attributes");
        let attribute = builder.type_ref("System", "ObsoleteAttribute");
        let constructor = builder.member_ref(attribute, ".ctor", &[0x20, 0x00, 0x01]);
        // prolog, no fixed arguments, one property `DiagnosticId` of type string
        let mut value = vec![0x01, 0x00, 0x01, 0x00, 0x54, 0x0E, 0x0C];
        value.extend_from_slice(b"DiagnosticId");
        value.extend_from_slice(&[0x03, b'X', b'0', b'1']);
        builder.custom_attribute(builder.assembly_token(), constructor, &value);

        assert_eq!(
            sorted(crawl(builder.build()).unwrap()),
            vec![
                "M:System.ObsoleteAttribute.#ctor",
                "P:System.ObsoleteAttribute.DiagnosticId",
                "T:System.ObsoleteAttribute",
            ]
        );
    }

    #[test]
    fn embedded_types_are_ignored() {
        let mut builder = ModuleBuilder::new("Embedded");
        let object = builder.type_ref("System", "Object");
        let attribute = builder.type_ref("System", "Attribute");
        let embedded = builder.type_def("Microsoft.CodeAnalysis", "EmbeddedAttribute", attribute);
        let constructor = builder.member_ref(
            Token::from_parts(TableId::TypeDef, embedded),
            ".ctor",
            &[0x20, 0x00, 0x01],
        );
        let hidden = builder.type_def("Sample", "Hidden", object);
        builder.custom_attribute(
            Token::from_parts(TableId::TypeDef, hidden),
            constructor,
            &[0x01, 0x00, 0x00, 0x00],
        );
        builder.field(hidden, "count", &[0x06, 0x0A]);

        let results = crawl(builder.build()).unwrap();
        assert!(!results.contains("T:System.Int64"));
        assert!(results.contains("T:System.Attribute"));
    }

    #[test]
    fn self_referencing_specification_hits_the_limit() {
        let mut builder = ModuleBuilder::new("Recursive");
        let object = builder.type_ref("System", "Object");
        let owner = builder.type_def("Sample", "Deep", object);

        // TypeSpec 1 is `SZARRAY CLASS <TypeSpec 1>`; 0x06 is TypeSpec row 1 as TypeDefOrRef
        let spec = builder.type_spec(&[0x1D, 0x12, 0x06]);
        assert_eq!(spec.row(), 1);
        builder.field(owner, "nested", &[0x06, 0x1D, 0x12, 0x06]);

        let reader = ModuleReader::open(builder.build()).unwrap();
        let crawler = AssemblyCrawler::with_options(CrawlOptions::default().with_max_depth(10));
        let result = crawler.crawl(&reader, &AssemblyContext::default());
        assert!(matches!(result, Err(crate::Error::RecursionLimit(10))));
    }

    #[test]
    fn crawling_twice_is_stable() {
        let mut builder = ModuleBuilder::new("Twice");
        let object = builder.type_ref("System", "Object");
        let value_type = builder.type_ref("System", "ValueType");
        builder.type_def("Sample", "Point", value_type);
        builder.type_def("Sample", "Class", object);
        let bytes = builder.build();

        let first = crawl(bytes.clone()).unwrap();
        let second = crawl(bytes).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("T:System.ValueType"));
    }
}
