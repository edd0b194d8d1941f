//! Tagged fixture sources driving the active statement map and the
//! exception region resolver.

use enc_remap::active_statements::{ActiveStatementId, ActiveStatementsMap};
use enc_remap::debugger::ActiveStatementFlags;
use enc_remap::fixtures::{MarkedSource, SourceMarkers, StatementDescription, active_statement_debug_infos, clear_tags};
use enc_remap::resolve_exception_regions;
use enc_remap::syntax::SyntaxRegistry;
use enc_remap::text::LinePositionSpan;
use enc_remap::workspace::{DocumentId, InMemoryWorkspace};

const PATH: &str = "Nested.cs";

const NESTED: &str = "class C
{
    void F()
    {
        try
        {
            try
            {
                <AS:1>G();</AS:1>
            }
            <ER:1.0>catch
            {
            }</ER:1.0>
        }
        <ER:1.1>finally
        {
        }</ER:1.1>
    }

    void G()
    {
        <AS:0>H();</AS:0>
    }
}
";

fn build_map(sources: &[MarkedSource], document: DocumentId, describe: fn(usize) -> StatementDescription) -> ActiveStatementsMap {
    let infos = active_statement_debug_infos(sources, describe).unwrap();
    ActiveStatementsMap::build(infos, |name| {
        if sources.iter().any(|source| source.path() == name) {
            vec![document]
        } else {
            Vec::new()
        }
    })
}

#[test]
fn test_cleared_text_keeps_offsets() {
    let source = MarkedSource::parse(PATH, NESTED).unwrap();
    assert_eq!(source.text().len(), NESTED.len());
    assert!(!source.text().contains("<AS:"));
    assert_eq!(source.text(), clear_tags(NESTED));
    assert_eq!(SourceMarkers::clear(NESTED), clear_tags(NESTED));

    let leaf = source.markers().active_statement(0).unwrap();
    assert_eq!(&source.text()[leaf.start..leaf.end], "H();");
}

#[test]
fn test_tagged_regions_match_resolved_regions() {
    let source = MarkedSource::parse(PATH, NESTED).unwrap();
    let workspace = InMemoryWorkspace::new();
    let document = workspace.add_document(PATH, None, source.text());
    let syntax = SyntaxRegistry::new();

    let map = build_map(std::slice::from_ref(&source), document, StatementDescription::for_ordinal);
    let regions = resolve_exception_regions(&map, &workspace, &syntax);

    assert_eq!(regions.len(), 2);
    for (id, entry) in regions.entries().iter().enumerate() {
        assert_eq!(entry.statement.id, ActiveStatementId(id));
        let expected = source.exception_region_spans(id).unwrap();
        assert_eq!(entry.exception_regions.spans(), Some(expected.as_slice()));
    }
    assert_eq!(
        source.exception_region_spans(1).unwrap(),
        vec![
            LinePositionSpan::from_bounds((10, 20), (12, 13)),
            LinePositionSpan::from_bounds((14, 16), (16, 9)),
        ]
    );
}

#[test]
fn test_multi_id_tag_yields_statements_with_same_span() {
    let tagged = "class C
{
    void F()
    {
        <AS:0,1>G();</AS:0,1>
    }
}
";
    let source = MarkedSource::parse(PATH, tagged).unwrap();
    assert_eq!(source.markers().active_statement_count(), 2);
    assert_eq!(
        source.active_statement_span(0).unwrap(),
        source.active_statement_span(1).unwrap()
    );

    // Two threads stopped in different methods at the same place.
    let workspace = InMemoryWorkspace::new();
    let document = workspace.add_document(PATH, Some("csharp"), source.text());
    let map = build_map(std::slice::from_ref(&source), document, StatementDescription::for_ordinal);
    assert_eq!(map.len(), 2);
    assert_eq!(map.document_statements(document).len(), 2);
}

#[test]
fn test_recursive_frames_merge_into_one_statement() {
    let tagged = "class C
{
    void F()
    {
        <AS:0,1>F();</AS:0,1>
    }
}
";
    let source = MarkedSource::parse(PATH, tagged).unwrap();
    let workspace = InMemoryWorkspace::new();
    let document = workspace.add_document(PATH, Some("csharp"), source.text());

    // Both frames execute the same instruction of the same method.
    let map = build_map(std::slice::from_ref(&source), document, |id| {
        StatementDescription::for_ordinal(id).with_method_row(1)
    });

    assert_eq!(map.len(), 1);
    let statement = &map.statements()[0];
    assert!(statement.flags.contains(ActiveStatementFlags::LEAF_FRAME));
    assert!(statement.flags.contains(ActiveStatementFlags::NON_LEAF_FRAME));
    assert!(statement.is_non_leaf());
}

#[test]
fn test_statement_tagged_in_two_sources_is_rejected() {
    let first = MarkedSource::parse("A.cs", "<AS:0>A();</AS:0>").unwrap();
    let second = MarkedSource::parse("B.cs", "<AS:0>B();</AS:0>").unwrap();
    assert!(active_statement_debug_infos(&[first, second], StatementDescription::for_ordinal).is_err());
}
