use dt::builder::DeviceTreeBuilder;
use log::LevelFilter;
use plmem::{
    PlmemModule,
    class::MemoryDevFs,
    identity::IdentityAllocator,
    logging::{self, LogSink},
};
use std::{fmt::Arguments, sync::Mutex};

struct Capture {
    lines: Mutex<Vec<String>>,
}

impl LogSink for Capture {
    fn write_line(&self, line: Arguments) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

static CAPTURE: Capture = Capture {
    lines: Mutex::new(Vec::new()),
};

fn captured(level: &str, needle: &str) -> bool {
    CAPTURE
        .lines
        .lock()
        .unwrap()
        .iter()
        .any(|line| line.contains(&format!("[{}]", level)) && line.contains(needle))
}

// The logger is process-wide, so every check lives in one test.
#[test]
fn probe_diagnostics_reach_the_sink() {
    logging::init(&CAPTURE, LevelFilter::Info).unwrap();
    assert!(logging::init(&CAPTURE, LevelFilter::Info).is_err());

    let mut builder = DeviceTreeBuilder::new();
    let root = builder.root();
    builder
        .prop_u32(root, "#address-cells", 1)
        .prop_u32(root, "#size-cells", 1);
    let unnamed = builder.add_node(root, "ram@a0000000");
    builder
        .prop_strlist(unnamed, "compatible", &["topic,plmem"])
        .prop_cells(unnamed, "reg", &[0xa000_0000, 0x1000]);
    let bogus = builder.add_node(root, "ram@b0000000");
    builder
        .prop_strlist(bogus, "compatible", &["topic,plmem"])
        .prop_cells(bogus, "reg", &[0xb000_0000, 0x1000])
        .prop_str(bogus, "topic,mem-type", "bogus");
    let tree = builder.build();

    let module =
        PlmemModule::with_identities(MemoryDevFs::new(), IdentityAllocator::new(240, 2)).unwrap();
    let outcomes = module.probe_tree(&tree);
    assert!(outcomes[0].result.is_ok());
    assert!(outcomes[1].result.is_err());

    assert!(captured("WARN", "/ram@a0000000: No label, using default: plmem"));
    assert!(captured("INFO", "/ram@a0000000"));
    assert!(captured("ERROR", "/ram@b0000000: probe failed: Invalid mem-type: bogus"));
    assert!(!captured("DEBUG", ""));

    let lines = CAPTURE.lines.lock().unwrap();
    assert!(lines.iter().all(|line| line.starts_with("\u{1B}[") && line.ends_with("\u{1B}[0m")));
}
