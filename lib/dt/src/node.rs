use crate::prop::{Property, PropertyError};
use alloc::{boxed::Box, string::String, vec, vec::Vec};
use core::ops::RangeInclusive;

/// `#address-cells` assumed when the parent does not declare it.
pub const DEFAULT_ADDRESS_CELLS: usize = 2;
/// `#size-cells` assumed when the parent does not declare it.
pub const DEFAULT_SIZE_CELLS: usize = 1;

pub struct DeviceTree {
    pub root_id: usize,
    pub container: Vec<Node>,
}

pub struct Node {
    pub node_id: usize,
    pub parent_id: usize,
    pub full_name: Box<str>,
    pub node_name: Box<str>,
    pub unit_addr: Box<str>,
    pub children: Vec<usize>,
    pub props: Vec<Property>,
}

impl DeviceTree {
    pub fn root(&self) -> &Node {
        &self.container[self.root_id]
    }
    pub fn is_root(&self, node: &Node) -> bool {
        node.node_id == self.root_id
    }
    fn full_path(&self, node: &Node) -> String {
        if self.is_root(node) {
            String::new()
        } else {
            self.full_path(self.get_parent(node)) + "/" + node.full_name.as_ref()
        }
    }
    /// Absolute path of `node`; the root is `/`.
    pub fn get_full_path(&self, node: &Node) -> Box<str> {
        let path = self.full_path(node);
        if path.is_empty() {
            Box::from("/")
        } else {
            path.into_boxed_str()
        }
    }
    pub fn get_parent(&self, node: &Node) -> &Node {
        &self.container[node.parent_id]
    }
    pub fn get_children<'b>(&'b self, node: &Node) -> impl Iterator<Item = &'b Node> {
        node.children.iter().map(|x| &self.container[*x])
    }
    pub fn get_property<'b>(&self, node: &'b Node, name: impl AsRef<str>) -> Option<&'b Property> {
        let name = name.as_ref();
        node.props.iter().find(|prop| prop.name.as_ref() == name)
    }
    pub fn get_node(&self, path: impl AsRef<str>) -> Option<&Node> {
        let mut node = self.root();
        for section in path.as_ref().split('/') {
            if section.trim().is_empty() {
                continue;
            }
            node = self
                .get_children(node)
                .find(|subnode| subnode.full_name.as_ref() == section)?;
        }
        Some(node)
    }
    /// Every node in depth-first pre-order, starting at the root.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self.root_id];
        core::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = &self.container[id];
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
    /// Whether the `compatible` string list of `node` contains `comp`.
    pub fn is_compatible(&self, node: &Node, comp: &str) -> bool {
        self.get_property(node, "compatible")
            .and_then(|prop| prop.value_as_strlist().ok())
            .is_some_and(|list| list.contains(&comp))
    }
    /// Nodes compatible with any of `comps`, in depth-first order.
    pub fn find_compatible<'b>(&'b self, comps: &'b [&'b str]) -> impl Iterator<Item = &'b Node> {
        self.iter()
            .filter(move |node| comps.iter().any(|comp| self.is_compatible(node, comp)))
    }
    fn cells_of(&self, node: &Node, name: &str, default: usize) -> Result<usize, PropertyError> {
        match self.get_property(node, name) {
            Some(prop) => Ok(prop.value_as_u32()? as usize),
            None => Ok(default),
        }
    }
    /// Decode the `reg` property into inclusive address ranges using the parent's cell sizes.
    ///
    /// An entry of size zero, or one whose last byte does not fit in `usize`, is malformed.
    pub fn get_reg_value(&self, node: &Node) -> Result<Vec<RangeInclusive<usize>>, PropertyError> {
        let (addr_cel, size_cel) = if self.is_root(node) {
            (DEFAULT_ADDRESS_CELLS, DEFAULT_SIZE_CELLS)
        } else {
            let parent = self.get_parent(node);
            (
                self.cells_of(parent, "#address-cells", DEFAULT_ADDRESS_CELLS)?,
                self.cells_of(parent, "#size-cells", DEFAULT_SIZE_CELLS)?,
            )
        };
        let reg = self
            .get_property(node, "reg")
            .ok_or(PropertyError::PropNotFound)?
            .value_as_cells()?;
        let width = size_cel + addr_cel;
        if width == 0 || reg.len() % width != 0 {
            return Err(PropertyError::InvalidPropFormat);
        }
        reg.chunks_exact(width)
            .map(|entry| {
                let addr = fold_cells(&entry[..addr_cel]).ok_or(PropertyError::InvalidPropFormat)?;
                let sz = fold_cells(&entry[addr_cel..]).ok_or(PropertyError::InvalidPropFormat)?;
                let last = sz
                    .checked_sub(1)
                    .and_then(|span| addr.checked_add(span))
                    .ok_or(PropertyError::InvalidPropFormat)?;
                Ok(addr..=last)
            })
            .collect()
    }
}

/// Concatenate big-endian cells into one number, failing if it does not fit.
fn fold_cells(cells: &[u32]) -> Option<usize> {
    let value = cells.iter().try_fold(0u64, |acc, cell| {
        (acc >> 32 == 0).then(|| (acc << 32) | u64::from(*cell))
    })?;
    usize::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use crate::{builder::DeviceTreeBuilder, prop::PropertyError};

    fn sample() -> super::DeviceTree {
        let mut builder = DeviceTreeBuilder::new();
        let root = builder.root();
        builder.prop_u32(root, "#address-cells", 2);
        builder.prop_u32(root, "#size-cells", 2);
        let soc = builder.add_node(root, "soc");
        builder.prop_u32(soc, "#address-cells", 1);
        builder.prop_u32(soc, "#size-cells", 1);
        let mem = builder.add_node(soc, "plmem@a0000000");
        builder.prop_strlist(mem, "compatible", &["topic,plmem"]);
        builder.prop_cells(mem, "reg", &[0xa000_0000, 0x1000]);
        let wide = builder.add_node(root, "bram@400000000");
        builder.prop_strlist(wide, "compatible", &["topic,iotester", "topic,plmem"]);
        builder.prop_cells(wide, "reg", &[0x4, 0x0, 0x0, 0x10000]);
        builder.build()
    }

    #[test]
    fn lookup_by_path_and_pattern() {
        let tree = sample();
        let node = tree.get_node("/soc/plmem@a0000000").unwrap();
        assert_eq!(&*node.node_name, "plmem");
        assert_eq!(&*node.unit_addr, "a0000000");
        assert_eq!(&*tree.get_full_path(node), "/soc/plmem@a0000000");
        assert_eq!(&*tree.get_full_path(tree.root()), "/");
        assert!(tree.get_node("/soc/missing").is_none());
    }

    #[test]
    fn reg_honours_parent_cells() {
        let tree = sample();
        let narrow = tree.get_node("/soc/plmem@a0000000").unwrap();
        assert_eq!(tree.get_reg_value(narrow).unwrap(), [0xa000_0000..=0xa000_0fff]);
        let wide = tree.get_node("/bram@400000000").unwrap();
        assert_eq!(tree.get_reg_value(wide).unwrap(), [0x4_0000_0000..=0x4_0000_ffff]);
    }

    #[test]
    fn reg_reaches_the_top_of_the_address_space() {
        let mut builder = DeviceTreeBuilder::new();
        let root = builder.root();
        builder
            .prop_u32(root, "#address-cells", 2)
            .prop_u32(root, "#size-cells", 1);
        let top = builder.add_node(root, "top@fffffffffffff000");
        builder.prop_cells(top, "reg", &[0xffff_ffff, 0xffff_f000, 0x1000]);
        let past = builder.add_node(root, "past@fffffffffffff000");
        builder.prop_cells(past, "reg", &[0xffff_ffff, 0xffff_f000, 0x1001]);
        let empty = builder.add_node(root, "empty@1000");
        builder.prop_cells(empty, "reg", &[0, 0x1000, 0]);
        let tree = builder.build();

        let top = tree.get_node("/top@fffffffffffff000").unwrap();
        assert_eq!(tree.get_reg_value(top).unwrap(), [0xffff_ffff_ffff_f000..=usize::MAX]);
        let past = tree.get_node("/past@fffffffffffff000").unwrap();
        assert_eq!(tree.get_reg_value(past), Err(PropertyError::InvalidPropFormat));
        let empty = tree.get_node("/empty@1000").unwrap();
        assert_eq!(tree.get_reg_value(empty), Err(PropertyError::InvalidPropFormat));
    }

    #[test]
    fn reg_must_fill_whole_entries() {
        let tree = sample();
        let mut builder = DeviceTreeBuilder::new();
        let root = builder.root();
        builder
            .prop_u32(root, "#address-cells", 2)
            .prop_u32(root, "#size-cells", 1);
        let odd = builder.add_node(root, "odd@a0000000");
        builder.prop_cells(odd, "reg", &[0, 0xa000_0000, 0x1000, 7]);
        let odd_tree = builder.build();
        let odd = odd_tree.get_node("/odd@a0000000").unwrap();
        assert_eq!(odd_tree.get_reg_value(odd), Err(PropertyError::InvalidPropFormat));
        assert_eq!(tree.get_reg_value(tree.root()), Err(PropertyError::PropNotFound));
    }

    #[test]
    fn compatible_matching_walks_depth_first() {
        let tree = sample();
        let found: alloc::vec::Vec<_> = tree
            .find_compatible(&["topic,plmem"])
            .map(|node| tree.get_full_path(node))
            .collect();
        assert_eq!(found.len(), 2);
        assert_eq!(&*found[0], "/soc/plmem@a0000000");
        assert!(tree.is_compatible(tree.get_node("/bram@400000000").unwrap(), "topic,iotester"));
        assert!(!tree.is_compatible(tree.root(), "topic,plmem"));
    }
}
