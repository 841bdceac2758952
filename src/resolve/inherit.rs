//! Gallery inheritance graph.
//!
//! Every gallery document is a node. A `pieces` document is a leaf; an
//! `$extends` document has edges to its targets, resolved relative to the
//! declaring document. Flattening is a memoized depth-first traversal: a
//! node is marked as resolving while its targets are visited, so reaching a
//! resolving node again is a cycle rather than unbounded recursion.

use super::ResolveError;
use crate::model::{DocId, GalleryDoc};
use crate::tree;
use std::collections::{BTreeMap, HashMap};

/// Address of one authored piece: its leaf document and list index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceRef<'a> {
    pub doc: &'a str,
    pub index: usize,
}

#[derive(Debug)]
enum Node {
    Leaf(usize),
    Extends(Vec<DocId>),
}

enum Visit<'a> {
    Resolving,
    Done(Vec<PieceRef<'a>>),
}

/// Inheritance edges of every gallery in a data root.
#[derive(Debug)]
pub struct InheritanceGraph<'a> {
    nodes: BTreeMap<&'a str, Node>,
}

impl<'a> InheritanceGraph<'a> {
    pub fn new(galleries: &'a BTreeMap<DocId, GalleryDoc>) -> Self {
        let nodes = galleries
            .iter()
            .map(|(doc, gallery)| {
                let node = match gallery {
                    GalleryDoc::Pieces(pieces) => Node::Leaf(pieces.len()),
                    GalleryDoc::Extends(targets) => Node::Extends(
                        targets.iter().map(|t| tree::doc_relative(doc, t)).collect(),
                    ),
                };
                (doc.as_str(), node)
            })
            .collect();
        Self { nodes }
    }

    /// Piece list of every gallery, inheritance flattened.
    ///
    /// A missing target logs a warning and contributes nothing. A cycle is a
    /// [`ResolveError::InheritanceCycle`].
    pub fn flatten(&self) -> Result<BTreeMap<&'a str, Vec<PieceRef<'a>>>, ResolveError> {
        let mut visits = HashMap::new();
        let mut stack = Vec::new();
        let mut out = BTreeMap::new();
        for &doc in self.nodes.keys() {
            let refs = self.visit(doc, &mut visits, &mut stack)?;
            out.insert(doc, refs);
        }
        Ok(out)
    }

    fn visit(
        &self,
        doc: &'a str,
        visits: &mut HashMap<&'a str, Visit<'a>>,
        stack: &mut Vec<&'a str>,
    ) -> Result<Vec<PieceRef<'a>>, ResolveError> {
        match visits.get(doc) {
            Some(Visit::Done(refs)) => return Ok(refs.clone()),
            Some(Visit::Resolving) => {
                let start = stack.iter().position(|d| *d == doc).unwrap_or(0);
                let mut chain: Vec<DocId> = stack[start..].iter().map(|d| d.to_string()).collect();
                chain.push(doc.to_string());
                return Err(ResolveError::InheritanceCycle { chain });
            }
            None => {}
        }

        let refs = match self.nodes.get(doc) {
            Some(Node::Leaf(count)) => (0..*count).map(|index| PieceRef { doc, index }).collect(),
            Some(Node::Extends(targets)) => {
                visits.insert(doc, Visit::Resolving);
                stack.push(doc);
                let mut refs = Vec::new();
                for target in targets {
                    match self.nodes.get_key_value(target.as_str()) {
                        Some((&target, _)) => refs.extend(self.visit(target, visits, stack)?),
                        None => tracing::warn!(
                            gallery = doc,
                            target = target.as_str(),
                            "Inheritance target not found; contributes no pieces"
                        ),
                    }
                }
                stack.pop();
                refs
            }
            None => Vec::new(),
        };
        visits.insert(doc, Visit::Done(refs.clone()));
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_gallery;

    fn leaf(n: usize) -> String {
        let mut text = String::from("pieces:\n");
        for i in 0..n {
            text.push_str(&format!(
                "  - name: p{i}\n    date: 2024-01-0{}\n    image: p{i}.png\n    alt: piece {i}\n",
                i + 1
            ));
        }
        text
    }

    fn graph_of(docs: &[(&str, String)]) -> BTreeMap<DocId, GalleryDoc> {
        docs.iter()
            .map(|(doc, text)| (doc.to_string(), parse_gallery(doc, text).unwrap()))
            .collect()
    }

    #[test]
    fn extends_concatenates_targets_in_order() {
        let galleries = graph_of(&[
            ("a.gallery", "$extends: [b.gallery, c.gallery]\n".into()),
            ("b.gallery", leaf(2)),
            ("c.gallery", leaf(3)),
        ]);
        let flat = InheritanceGraph::new(&galleries).flatten().unwrap();

        let a = &flat["a.gallery"];
        assert_eq!(a.len(), 5);
        assert!(a[..2].iter().all(|r| r.doc == "b.gallery"));
        assert!(a[2..].iter().all(|r| r.doc == "c.gallery"));
        assert_eq!(a[2].index, 0);
        assert_eq!(a[4].index, 2);
    }

    #[test]
    fn missing_target_contributes_nothing() {
        let galleries = graph_of(&[
            ("a.gallery", "$extends: [d.gallery, b.gallery]\n".into()),
            ("b.gallery", leaf(2)),
        ]);
        let flat = InheritanceGraph::new(&galleries).flatten().unwrap();
        assert_eq!(flat["a.gallery"].len(), 2);
    }

    #[test]
    fn targets_resolve_relative_to_declaring_document() {
        let galleries = graph_of(&[
            ("art/all.gallery", "$extends: [sketches.gallery, ../top.gallery]\n".into()),
            ("art/sketches.gallery", leaf(1)),
            ("top.gallery", leaf(1)),
            ("sketches.gallery", leaf(4)),
        ]);
        let flat = InheritanceGraph::new(&galleries).flatten().unwrap();
        let docs: Vec<_> = flat["art/all.gallery"].iter().map(|r| r.doc).collect();
        assert_eq!(docs, vec!["art/sketches.gallery", "top.gallery"]);
    }

    #[test]
    fn nested_extends_are_flattened() {
        let galleries = graph_of(&[
            ("a.gallery", "$extends: [b.gallery]\n".into()),
            ("b.gallery", "$extends: [c.gallery, c.gallery]\n".into()),
            ("c.gallery", leaf(1)),
        ]);
        let flat = InheritanceGraph::new(&galleries).flatten().unwrap();
        assert_eq!(flat["a.gallery"].len(), 2);
        assert_eq!(flat["b.gallery"].len(), 2);
    }

    #[test]
    fn cycle_is_an_error_naming_the_chain() {
        let galleries = graph_of(&[
            ("a.gallery", "$extends: [b.gallery]\n".into()),
            ("b.gallery", "$extends: [a.gallery]\n".into()),
        ]);
        let err = InheritanceGraph::new(&galleries).flatten().unwrap_err();
        match err {
            ResolveError::InheritanceCycle { chain } => {
                assert_eq!(chain, vec!["a.gallery", "b.gallery", "a.gallery"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_extension_is_a_cycle() {
        let galleries = graph_of(&[("a.gallery", "$extends: [a.gallery]\n".into())]);
        assert!(matches!(
            InheritanceGraph::new(&galleries).flatten(),
            Err(ResolveError::InheritanceCycle { .. })
        ));
    }
}
