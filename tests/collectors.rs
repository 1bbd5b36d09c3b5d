//! Every usage collector over one module that exercises all of them.

use std::collections::BTreeMap;

use usagescope::{
    collectors::{Context, FeatureUsage, Incremental, IncrementalUsageCollector, UsageCollectorSet},
    crawler::{ApiKey, AssemblyContext, TargetFramework},
    metadata::{
        naming::type_ref_doc_id,
        reader::ModuleReader,
        tables::{TableId, TypeRefRaw},
        token::Token,
    },
    test::ModuleBuilder,
    Result,
};

const VOID_METHOD: &[u8] = &[0x00, 0x00, 0x01];
const INSTANCE_VOID_METHOD: &[u8] = &[0x20, 0x00, 0x01];

fn with_token(opcode: u8, token: Token) -> Vec<u8> {
    let mut code = vec![opcode];
    code.extend_from_slice(&token.value().to_le_bytes());
    code
}

fn library() -> Vec<u8> {
    let mut builder = ModuleBuilder::new("Library");
    let object = builder.type_ref("System", "Object");
    let value_type = builder.type_ref("System", "ValueType");
    let string = builder.type_ref("System", "String");
    let disposable = builder.type_ref("System", "IDisposable");
    let argument = builder.type_ref("System", "ArgumentException");
    let io = builder.type_ref("System.IO", "IOException");
    let settings = builder.type_ref("Contoso", "Settings");
    builder.type_ref("System.Runtime.CompilerServices", "NullableAttribute");
    let by_ref_like = builder.type_ref("System.Runtime.CompilerServices", "IsByRefLikeAttribute");
    let framework = builder.type_ref("System.Runtime.Versioning", "TargetFrameworkAttribute");

    let empty = builder.member_ref(string, "Empty", &[0x06, 0x0E]);
    let verbose = builder.member_ref(settings, "Verbose", &[0x06, 0x02]);
    let argument_ctor = builder.member_ref(argument, ".ctor", &[0x20, 0x01, 0x01, 0x0E]);
    let dispose = builder.member_ref(disposable, "Dispose", INSTANCE_VOID_METHOD);
    let by_ref_like_ctor = builder.member_ref(by_ref_like, ".ctor", INSTANCE_VOID_METHOD);
    let framework_ctor = builder.member_ref(framework, ".ctor", &[0x20, 0x01, 0x01, 0x0E]);

    let mut moniker = vec![0x01, 0x00, 0x19];
    moniker.extend_from_slice(b".NETStandard,Version=v2.0");
    moniker.extend_from_slice(&[0x00, 0x00]);
    builder.custom_attribute(builder.assembly_token(), framework_ctor, &moniker);

    // class Worker : IDisposable
    let worker = builder.type_def("Library", "Worker", object);
    builder.interface_impl(worker, disposable);

    // ldc.i4.1; stsfld Verbose; ldsfld Empty; newobj ArgumentException(string); throw
    let mut code = vec![0x17];
    code.extend(with_token(0x80, verbose));
    code.extend(with_token(0x7E, empty));
    code.extend(with_token(0x73, argument_ctor));
    code.push(0x7A);
    let run = builder.method(worker, "Run", VOID_METHOD, Some(&code));
    builder.catch_clause(run, io);

    // interface IShape : IDisposable { void IDisposable.Dispose() { } static abstract void Create(); }
    let shape = builder.interface_def("Library", "IShape");
    let dispose_body = builder.method(shape, "System.IDisposable.Dispose", INSTANCE_VOID_METHOD, Some(&[0x2A]));
    let create = builder.method(shape, "Create", VOID_METHOD, None);
    builder.method_flags(create, 0x0456);
    builder.method_impl(
        shape,
        Token::from_parts(TableId::MethodDef, dispose_body),
        dispose,
    );

    // ref struct Cursor { ref int position; }
    let cursor = builder.type_def("Library", "Cursor", value_type);
    builder.field(cursor, "position", &[0x06, 0x10, 0x08]);
    builder.custom_attribute(
        Token::from_parts(TableId::TypeDef, cursor),
        by_ref_like_ctor,
        &[0x01, 0x00, 0x00, 0x00],
    );

    builder.build()
}

fn run(bytes: Vec<u8>, context: &AssemblyContext) -> BTreeMap<&'static str, Vec<String>> {
    let reader = ModuleReader::open(bytes).unwrap();
    let mut collectors = UsageCollectorSet::new();
    collectors.collect(&reader, context).unwrap();

    collectors
        .results()
        .map(|result| {
            let mut features: Vec<String> =
                result.features.iter().map(ToString::to_string).collect();
            features.sort();
            (result.name, features)
        })
        .collect()
}

#[test]
fn every_detector_over_one_module() {
    let results = run(library(), &AssemblyContext::default());

    let expected: BTreeMap<&str, Vec<&str>> = BTreeMap::from([
        (
            "DefaultInterfaceImplementation",
            vec!["Dim(M:System.IDisposable.Dispose)"],
        ),
        (
            "DefinesAnyDefaultInterfaceMembers",
            vec!["DefinesAnyDefaultInterfaceMembers"],
        ),
        ("DefinesAnyRefFields", vec!["DefinesAnyRefFields"]),
        ("DefinesAnyRefStructs", vec!["DefinesAnyRefStructs"]),
        (
            "DefinesAnyVirtualStaticInterfaceMembers",
            vec!["DefinesAnyVirtualStaticInterfaceMembers"],
        ),
        (
            "DerivesFrom",
            vec![
                "DerivesFrom(T:System.IDisposable)",
                "DerivesFrom(T:System.Object)",
                "DerivesFrom(T:System.ValueType)",
            ],
        ),
        (
            "Exception",
            vec![
                "ExceptionCatch(T:System.IO.IOException)",
                "ExceptionThrow(M:System.ArgumentException.#ctor(System.String))",
            ],
        ),
        (
            "FieldAccess",
            vec![
                "FieldRead(F:System.String.Empty)",
                "FieldWrite(F:Contoso.Settings.Verbose)",
            ],
        ),
        ("TargetFramework", vec!["TargetFramework(netstandard2.0)"]),
        (
            "UsesNullableReferenceTypes",
            vec!["UsesNullableReferenceTypes"],
        ),
    ]);

    assert_eq!(results.len(), expected.len());
    for (name, features) in expected {
        assert_eq!(results[name], features, "{name}");
    }
}

#[test]
fn empty_module_has_no_facts() {
    let results = run(ModuleBuilder::new("Empty").build(), &AssemblyContext::default());
    assert_eq!(results.len(), 10);
    assert!(results.values().all(Vec::is_empty));
}

#[test]
fn package_framework_overrides_the_declared_one() {
    let context = AssemblyContext::for_framework(TargetFramework::parse("net8.0").unwrap());
    let results = run(library(), &context);
    assert_eq!(results["TargetFramework"], ["TargetFramework(net8.0)"]);
}

/// Reports the base type of every type, interfaces left out.
#[derive(Default)]
struct BaseTypes;

impl IncrementalUsageCollector for BaseTypes {
    const VERSION_REQUIRED: u32 = 1;
    const NAME: &'static str = "BaseTypes";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;
            if typedef.extends.is_nil() || typedef.extends.tag != TableId::TypeRef {
                continue;
            }

            let typeref = reader.row::<TypeRefRaw>(typedef.extends.row)?;
            if let Some(doc_id) = type_ref_doc_id(reader, &typeref)? {
                context.report(FeatureUsage::DerivesFrom(ApiKey::new(doc_id)));
            }
        }

        Ok(())
    }
}

#[test]
fn custom_detectors_join_the_set() {
    let reader = ModuleReader::open(library()).unwrap();
    let mut collectors = UsageCollectorSet::empty().with(Incremental::<BaseTypes>::new());
    assert_eq!(collectors.len(), 1);
    collectors
        .collect(&reader, &AssemblyContext::default())
        .unwrap();

    let result = collectors.results().next().unwrap();
    assert_eq!((result.name, result.version), ("BaseTypes", 1));

    let mut features: Vec<String> = result.features.iter().map(ToString::to_string).collect();
    features.sort();
    assert_eq!(
        features,
        ["DerivesFrom(T:System.Object)", "DerivesFrom(T:System.ValueType)"]
    );
}
