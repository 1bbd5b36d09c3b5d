//! Opening modules from disk, from custom backends and from damaged bytes.

use std::{io::Write, sync::Arc};

use usagescope::{
    collectors::UsageCollectorSet,
    crawler::{AssemblyContext, AssemblyCrawler},
    disassembler::OpCode,
    file::Backend,
    metadata::{reader::ModuleReader, tables::TypeDefRaw},
    test::ModuleBuilder,
    Error, Result,
};

fn sample() -> Vec<u8> {
    let mut builder = ModuleBuilder::new("Sample");
    let object = builder.type_ref("System", "Object");
    let console = builder.type_ref("System", "Console");
    let write_line = builder.member_ref(console, "WriteLine", &[0x00, 0x01, 0x01, 0x0E]);
    let program = builder.type_def("Sample", "Program", object);

    // ldstr; call Console.WriteLine(string); ret
    let mut code = vec![0x72, 0x01, 0x00, 0x00, 0x70, 0x28];
    code.extend_from_slice(&write_line.value().to_le_bytes());
    code.push(0x2A);
    builder.method(program, "Main", &[0x00, 0x00, 0x01], Some(&code));
    builder.build()
}

#[test]
fn reads_memory_mapped_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&sample()).unwrap();
    file.flush().unwrap();

    let reader = ModuleReader::from_file(file.path()).unwrap();
    assert_eq!(reader.string(reader.assembly().unwrap().name).unwrap(), "Sample");

    let names: Vec<String> = reader
        .type_refs()
        .iter()
        .map(|typeref| {
            let typeref = typeref.unwrap();
            reader.string(typeref.type_name).unwrap().to_string()
        })
        .collect();
    assert_eq!(names, ["Object", "Console"]);

    let program = reader.row::<TypeDefRaw>(2).unwrap();
    let main = &reader.methods(&program).unwrap()[0];
    let opcodes: Vec<OpCode> = reader.instructions(main).map(|(opcode, _)| opcode).collect();
    assert_eq!(opcodes, [OpCode::LDSTR, OpCode::CALL, OpCode::RET]);
}

#[test]
fn missing_files_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let result = ModuleReader::from_file(&dir.path().join("Missing.dll"));
    assert!(matches!(result, Err(Error::FileError(_))));
}

/// A buffer shared with other owners.
struct Shared(Arc<Vec<u8>>);

impl Backend for Shared {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.0.get(offset..end))
            .ok_or(Error::OutOfBounds {
                file: file!(),
                line: line!(),
            })
    }

    fn data(&self) -> &[u8] {
        &self.0
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[test]
fn custom_backends() {
    let bytes = Arc::new(sample());
    let first = ModuleReader::from_backend(Shared(Arc::clone(&bytes))).unwrap();
    let second = ModuleReader::from_backend(Shared(Arc::clone(&bytes))).unwrap();

    let context = AssemblyContext::default();
    let crawler = AssemblyCrawler::new();
    assert_eq!(
        crawler.crawl(&first, &context).unwrap(),
        crawler.crawl(&second, &context).unwrap()
    );
    assert!(crawler
        .crawl(&first, &context)
        .unwrap()
        .contains("M:System.Console.WriteLine(System.String)"));
}

#[test]
fn truncated_images_never_panic() {
    let bytes = sample();
    assert!(ModuleReader::open(bytes[..0x100].to_vec()).is_err());

    for len in 0..bytes.len() {
        let Ok(reader) = ModuleReader::open(bytes[..len].to_vec()) else {
            continue;
        };

        let context = AssemblyContext::default();
        let _ = AssemblyCrawler::new().crawl(&reader, &context);
        let _ = UsageCollectorSet::new().collect(&reader, &context);
    }
}
