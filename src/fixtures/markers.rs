//! Active statement, exception region and tracking span markers of one
//! tagged source.

use super::scanner::{TagKind, TaggedSpan, clear_tags, match_tags};
use crate::error::{EncError, EncResult};
use crate::text::TextSpan;

/// Markers parsed from a tagged source, by id.
///
/// Ids are sparse: an id may be used without all lower ids being defined.
/// Exception region gaps hold an empty span.
/// Offsets refer equally to the tagged and the cleared source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMarkers {
    active_statements: Vec<Option<TextSpan>>,
    exception_regions: Vec<Vec<TextSpan>>,
    tracking_spans: Vec<Option<TextSpan>>,
}

impl SourceMarkers {
    pub fn parse(source: &str) -> EncResult<Self> {
        let mut markers = SourceMarkers::default();
        let mut regions: Vec<Vec<Option<TextSpan>>> = Vec::new();

        for tag in match_tags(source)? {
            match tag.kind {
                TagKind::ActiveStatement => {
                    for id in parse_ids(&tag)? {
                        set_sparse(&mut markers.active_statements, id, tag.content, &tag)?;
                    }
                }
                TagKind::TrackingSpan => {
                    for id in parse_ids(&tag)? {
                        set_sparse(&mut markers.tracking_spans, id, tag.content, &tag)?;
                    }
                }
                TagKind::ExceptionRegion => {
                    for (statement, index) in parse_region_ids(&tag)? {
                        if regions.len() <= statement {
                            regions.resize_with(statement + 1, Vec::new);
                        }
                        set_sparse(&mut regions[statement], index, tag.content, &tag)?;
                    }
                }
            }
        }

        // A region index left out of the markup keeps an empty placeholder.
        markers.exception_regions = regions
            .into_iter()
            .map(|spans| spans.into_iter().map(Option::unwrap_or_default).collect())
            .collect();

        Ok(markers)
    }

    /// The source with every tag replaced by spaces.
    pub fn clear(source: &str) -> String {
        clear_tags(source)
    }

    /// One past the highest active statement id.
    pub fn active_statement_count(&self) -> usize {
        self.active_statements.len()
    }

    pub fn active_statement(&self, id: usize) -> Option<TextSpan> {
        self.active_statements.get(id).copied().flatten()
    }

    /// Defined active statements in id order.
    pub fn active_statements(&self) -> impl Iterator<Item = (usize, TextSpan)> + '_ {
        defined(&self.active_statements)
    }

    /// Exception regions of an active statement, by region index. Indices
    /// missing from the markup hold an empty span at offset 0.
    pub fn exception_regions(&self, id: usize) -> &[TextSpan] {
        self.exception_regions
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tracking_span(&self, id: usize) -> Option<TextSpan> {
        self.tracking_spans.get(id).copied().flatten()
    }

    /// Defined tracking spans in id order.
    pub fn tracking_spans(&self) -> impl Iterator<Item = (usize, TextSpan)> + '_ {
        defined(&self.tracking_spans)
    }
}

fn defined(spans: &[Option<TextSpan>]) -> impl Iterator<Item = (usize, TextSpan)> + '_ {
    spans
        .iter()
        .enumerate()
        .filter_map(|(id, span)| span.map(|span| (id, span)))
}

fn set_sparse(slots: &mut Vec<Option<TextSpan>>, id: usize, span: TextSpan, tag: &TaggedSpan<'_>) -> EncResult<()> {
    if slots.len() <= id {
        slots.resize(id + 1, None);
    }
    if slots[id].is_some() {
        return Err(EncError::fixture(
            tag.offset,
            format!("{} id {} is defined twice", tag.kind, tag.ids),
        ));
    }
    slots[id] = Some(span);
    Ok(())
}

fn parse_ids(tag: &TaggedSpan<'_>) -> EncResult<Vec<usize>> {
    tag.ids
        .split(',')
        .map(|id| {
            id.parse::<usize>().map_err(|_| {
                EncError::fixture(tag.offset, format!("invalid {} id '{}'", tag.kind, id))
            })
        })
        .collect()
}

fn parse_region_ids(tag: &TaggedSpan<'_>) -> EncResult<Vec<(usize, usize)>> {
    tag.ids
        .split(',')
        .map(|pair| {
            pair.split_once('.')
                .and_then(|(statement, index)| Some((statement.parse::<usize>().ok()?, index.parse::<usize>().ok()?)))
                .ok_or_else(|| {
                    EncError::fixture(
                        tag.offset,
                        format!("invalid exception region id '{}', expected 'statement.index'", pair),
                    )
                })
        })
        .collect()
}
