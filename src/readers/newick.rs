use crate::lineage::tree::PhyloTree;
use anyhow::{anyhow, bail, Context, Result};
use std::io::Read;
use std::path::Path;

struct RawNode {
    label: Option<String>,
    children: Vec<usize>,
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    nodes: Vec<RawNode>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            nodes: Vec::new(),
        }
    }

    fn skip_ignored(&mut self) -> Result<()> {
        loop {
            match self.input.get(self.pos) {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'[') => {
                    let close = self.input[self.pos..]
                        .iter()
                        .position(|&b| b == b']')
                        .ok_or_else(|| anyhow!("unterminated comment at byte {}", self.pos))?;
                    self.pos += close + 1;
                }
                _ => return Ok(()),
            }
        }
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        self.skip_ignored()?;
        Ok(self.input.get(self.pos).copied())
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        match self.peek()? {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => bail!(
                "expected '{}' at byte {}, found '{}'",
                byte as char,
                self.pos,
                b as char
            ),
            None => bail!("expected '{}' but input ended", byte as char),
        }
    }

    fn label(&mut self) -> Result<Option<String>> {
        match self.peek()? {
            Some(b'\'') => {
                self.pos += 1;
                let mut label = Vec::new();
                loop {
                    match self.input.get(self.pos) {
                        Some(b'\'') if self.input.get(self.pos + 1) == Some(&b'\'') => {
                            label.push(b'\'');
                            self.pos += 2;
                        }
                        Some(b'\'') => {
                            self.pos += 1;
                            break;
                        }
                        Some(&b) => {
                            label.push(b);
                            self.pos += 1;
                        }
                        None => bail!("unterminated quoted label"),
                    }
                }
                Ok(Some(String::from_utf8_lossy(&label).into_owned()))
            }
            _ => {
                let start = self.pos;
                while let Some(&b) = self.input.get(self.pos) {
                    if matches!(b, b',' | b'(' | b')' | b':' | b';' | b'[') || b.is_ascii_whitespace() {
                        break;
                    }
                    self.pos += 1;
                }
                if self.pos == start {
                    return Ok(None);
                }
                let raw = String::from_utf8_lossy(&self.input[start..self.pos]);
                Ok(Some(raw.trim().to_string()))
            }
        }
    }

    fn branch_length(&mut self) -> Result<()> {
        if self.peek()? == Some(b':') {
            self.pos += 1;
            self.skip_ignored()?;
            let start = self.pos;
            while let Some(&b) = self.input.get(self.pos) {
                if !(b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')) {
                    break;
                }
                self.pos += 1;
            }
            if self.pos == start {
                bail!("missing branch length at byte {}", start);
            }
        }
        Ok(())
    }

    fn subtree(&mut self) -> Result<usize> {
        let id = self.nodes.len();
        self.nodes.push(RawNode {
            label: None,
            children: Vec::new(),
        });

        if self.peek()? == Some(b'(') {
            self.pos += 1;
            loop {
                let child = self.subtree()?;
                self.nodes[id].children.push(child);
                match self.peek()? {
                    Some(b',') => self.pos += 1,
                    _ => break,
                }
            }
            self.expect(b')')?;
        }
        self.nodes[id].label = self.label()?;
        self.branch_length()?;
        Ok(id)
    }
}

/// Parse an internal node label as a support value. Labels such as
/// `80.1/97` (SH-aLRT/UFBoot) use their last component.
pub fn parse_support(label: &str) -> Option<f64> {
    label
        .rsplit('/')
        .next()
        .and_then(|last| last.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Parse a Newick string. Tips are numbered left to right, internal nodes in
/// preorder starting at the root; internal labels become support values.
pub fn parse_newick(text: &str) -> Result<PhyloTree> {
    let mut parser = Parser::new(text);
    parser.subtree()?;
    parser.expect(b';')?;
    if let Some(b) = parser.peek()? {
        bail!("unexpected '{}' after end of tree", b as char);
    }

    let nodes = parser.nodes;
    let n_tips = nodes.iter().filter(|n| n.children.is_empty()).count();
    let mut final_id = vec![0usize; nodes.len()];
    let mut tip_labels = Vec::with_capacity(n_tips);
    let mut next_internal = n_tips;

    // Arena order is preorder because each node is pushed before its children.
    for (raw_id, node) in nodes.iter().enumerate() {
        if node.children.is_empty() {
            let label = node
                .label
                .clone()
                .ok_or_else(|| anyhow!("tip {} has no label", tip_labels.len() + 1))?;
            final_id[raw_id] = tip_labels.len();
            tip_labels.push(label);
        } else {
            final_id[raw_id] = next_internal;
            next_internal += 1;
        }
    }

    let mut children = vec![Vec::new(); nodes.len()];
    let mut support = vec![None; nodes.len()];
    for (raw_id, node) in nodes.iter().enumerate() {
        let id = final_id[raw_id];
        children[id] = node.children.iter().map(|&c| final_id[c]).collect();
        if !node.children.is_empty() {
            support[id] = node.label.as_deref().and_then(parse_support);
        }
    }

    Ok(PhyloTree::from_children(tip_labels, children, support)?)
}

/// Read a Newick file, transparently decompressing gzip/bzip2/xz input.
pub fn read_newick(path: &Path) -> Result<PhyloTree> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open tree file {}", path.display()))?;
    let (mut reader, _compression) = niffler::get_reader(Box::new(file))?;
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to read tree file {}", path.display()))?;
    parse_newick(&text).with_context(|| format!("Failed to parse tree file {}", path.display()))
}
