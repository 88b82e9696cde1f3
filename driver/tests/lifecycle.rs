use dt::{builder::DeviceTreeBuilder, node::DeviceTree};
use plmem::{
    CacheMode, PlmemModule,
    binder::BindError,
    chrdev::FileError,
    class::MemoryDevFs,
    driver::{Driver, ProbeError},
    error::{Errno, ErrorKind},
    identity::{DevId, IdentityAllocator},
    instance::NodeState,
    mmap::{IoRemap, MapError, VmArea, VmError, VmFlags, iomap_plan},
    region::PhysAddr,
};

/// Board with an FPGA window, a tester window without label and a misconfigured sibling.
fn board() -> DeviceTree {
    let mut builder = DeviceTreeBuilder::new();
    let root = builder.root();
    builder
        .prop_u32(root, "#address-cells", 2)
        .prop_u32(root, "#size-cells", 1);
    let soc = builder.add_node(root, "soc");
    builder
        .prop_u32(soc, "#address-cells", 1)
        .prop_u32(soc, "#size-cells", 1);

    let fpga = builder.add_node(soc, "fpga-ram@a0000000");
    builder
        .prop_strlist(fpga, "compatible", &["topic,plmem"])
        .prop_cells(fpga, "reg", &[0xa000_0000, 0x10_0000])
        .prop_str(fpga, "label", "fpga0");

    let tester = builder.add_node(soc, "iotester@b0000000");
    builder
        .prop_strlist(tester, "compatible", &["vendor,tester-v2", "topic,iotester"])
        .prop_cells(tester, "reg", &[0xb000_0000, 0x1000]);

    let broken = builder.add_node(soc, "fpga-ram@c0000000");
    builder
        .prop_strlist(broken, "compatible", &["topic,plmem"])
        .prop_cells(broken, "reg", &[0xc000_0000, 0x1000])
        .prop_str(broken, "topic,mem-type", "uncached")
        .prop_str(broken, "label", "fpga1");

    let bare = builder.add_node(soc, "fpga-ram@d0000000");
    builder.prop_strlist(bare, "compatible", &["topic,plmem"]);
    builder.build()
}

/// Mapper that validates each request the way the page-table code would.
struct Checked;

impl IoRemap for Checked {
    fn remap_io(&self, vma: &mut VmArea, phys: PhysAddr, len: usize) -> Result<(), VmError> {
        iomap_plan(vma, phys, len)?;
        vma.flags |= VmFlags::IO | VmFlags::PFNMAP | VmFlags::DONTEXPAND | VmFlags::DONTDUMP;
        Ok(())
    }
}

fn user_area(len: usize) -> VmArea {
    VmArea::new(0x7f00_0000_0000, len, 0, VmFlags::READ | VmFlags::WRITE | VmFlags::SHARED)
}

#[test]
fn enumeration_binds_each_node_independently() {
    let module =
        PlmemModule::with_identities(MemoryDevFs::new(), IdentityAllocator::new(240, 8)).unwrap();
    let outcomes = module.probe_tree(&board());
    let results: Vec<(&str, _)> = outcomes
        .iter()
        .map(|outcome| (&*outcome.path, outcome.result.clone()))
        .collect();
    assert_eq!(
        results,
        [
            ("/soc/fpga-ram@a0000000", Ok(DevId::new(240, 0))),
            ("/soc/iotester@b0000000", Ok(DevId::new(241, 0))),
            (
                "/soc/fpga-ram@c0000000",
                Err(ProbeError::Bind(BindError::InvalidMemType("uncached".into())))
            ),
            (
                "/soc/fpga-ram@d0000000",
                Err(ProbeError::Bind(BindError::MissingResource))
            ),
        ]
    );
    let missing = outcomes[3].result.as_ref().unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Resource);
    assert_eq!(missing.errno(), Errno::ENODEV);
    assert_eq!(
        outcomes[2].result.as_ref().unwrap_err().errno(),
        Errno::EINVAL
    );

    let fs = module.class().backend();
    let visible: [Box<str>; 2] = ["/dev/fpga0".into(), "/dev/plmem".into()];
    assert_eq!(fs.paths(), visible);
    assert_eq!(fs.lookup("/dev/fpga0"), Some(DevId::new(240, 0)));
    assert_eq!(fs.lookup("/dev/fpga1"), None);

    let fpga = module.instance("/soc/fpga-ram@a0000000").unwrap();
    assert_eq!(*fpga.spec().base(), 0xa000_0000);
    assert_eq!(fpga.spec().length(), 0x10_0000);
    assert_eq!(fpga.spec().cache_mode(), CacheMode::WriteCombine);
    let tester = module.instance("/soc/iotester@b0000000").unwrap();
    assert_eq!(tester.spec().cache_mode(), CacheMode::NonCached);
    assert_eq!(tester.label(), "plmem");
}

#[test]
fn opened_nodes_map_their_whole_region() {
    let module =
        PlmemModule::with_identities(MemoryDevFs::new(), IdentityAllocator::new(240, 8)).unwrap();
    module.probe_tree(&board());
    let files = module.files();
    let id = module.class().backend().lookup("/dev/fpga0").unwrap();
    let session = files.open(id).unwrap();

    let mut area = user_area(0x10_0000);
    files.mmap(session, &mut area, &Checked).unwrap();
    assert!(area.flags.contains(VmFlags::IO | VmFlags::PFNMAP));
    assert_eq!(area.page_prot.cache_mode(), CacheMode::WriteCombine);

    let mut too_big = user_area(0x20_0000);
    assert_eq!(
        files.mmap(session, &mut too_big, &Checked),
        Err(MapError::Vm(VmError::OutOfRange))
    );
    assert_eq!(
        files.ioctl(session, 0x1234, 0),
        Err(FileError::NotSupported { cmd: 0x1234 })
    );
    files.close(session).unwrap();
    assert_eq!(files.session_count(), 0);
}

#[test]
fn remove_and_exit_release_every_resource() {
    let module =
        PlmemModule::with_identities(MemoryDevFs::new(), IdentityAllocator::new(240, 8)).unwrap();
    module.probe_tree(&board());
    let fpga = module.instance("/soc/fpga-ram@a0000000").unwrap();
    let id = fpga.identity();
    let session = module.files().open(id).unwrap();

    module.remove("/soc/fpga-ram@a0000000").unwrap();
    assert_eq!(fpga.state(), NodeState::Destroyed);
    assert!(!module.files().is_routed(id));
    assert!(!module.files().identities().is_allocated(id));
    assert_eq!(module.class().backend().lookup("/dev/fpga0"), None);
    assert_eq!(module.files().open(id), Err(FileError::NoDevice(id)));
    assert_eq!(
        module.files().mmap(session, &mut user_area(0x1000), &Checked),
        Err(MapError::NoDevice)
    );

    // The freed identity is handed out again.
    let tree = board();
    let node = tree.get_node("/soc/fpga-ram@a0000000").unwrap();
    let again = module.probe(&plmem::binder::DtNode::new(&tree, node)).unwrap();
    assert_eq!(again, id);

    let fs = module.exit();
    assert!(fs.paths().is_empty());
    assert!(!fs.has_class("plmem"));
}
