//! End-to-end edit session scenarios over a tagged C# document.


use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use enc_remap::active_statements::ActiveStatementId;
use enc_remap::debugger::{EncAvailabilityStatus, ManagedInstructionId, MethodToken, ModuleId};
use enc_remap::fixtures::{FIXTURE_MODULE, MarkedSource, StatementDescription, active_statement_debug_infos};
use enc_remap::text::LinePositionSpan;
use enc_remap::workspace::WorkspaceService;
use enc_remap::{ActiveStatementUpdate, EncError, ExceptionRegionUpdate, NonRemappableRegion};
use tokio_util::sync::CancellationToken;

use helpers_session::{
    Fixture, PATH, SOURCE, change_leaf_argument, delete_blank_line, insert_line_in_main,
    statement_method, statement_token,
};

fn span(start: (u32, u32), end: (u32, u32)) -> LinePositionSpan {
    LinePositionSpan::from_bounds(start, end)
}

fn tokens(ids: &[usize]) -> HashSet<MethodToken> {
    ids.iter().map(|&id| statement_token(id)).collect()
}

fn leaf_instruction() -> ManagedInstructionId {
    StatementDescription::for_ordinal(0).instruction()
}

const LEAF_SPAN: ((u32, u32), (u32, u32)) = ((16, 14), (16, 35));
const CALLER_SPAN: ((u32, u32), (u32, u32)) = ((6, 18), (6, 22));
const FINALLY_SPAN: ((u32, u32), (u32, u32)) = ((8, 16), (11, 9));

#[tokio::test]
async fn test_fixture_regions_match_resolved_regions() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    let cancel = CancellationToken::new();

    let regions = fixture.session.exception_regions(&cancel).await.unwrap();
    let map = fixture.session.active_statements(&cancel).await.unwrap();
    assert_eq!(regions.len(), map.len());

    for entry in regions.entries() {
        let expected = fixture.source.exception_region_spans(entry.statement.id.0).unwrap();
        assert_eq!(entry.exception_regions.spans(), Some(expected.as_slice()));
    }
    assert_eq!(
        regions.entries()[1].exception_regions.spans(),
        Some(&[span(FINALLY_SPAN.0, FINALLY_SPAN.1)][..])
    );
}

#[tokio::test]
async fn test_unchanged_method_moved_up_records_negative_delta() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(delete_blank_line);

    let cancel = CancellationToken::new();
    let update = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();

    assert!(update.active_statement_updates.is_empty());
    assert!(update.exception_region_updates.is_empty());
    assert!(fixture.session.non_remappable_regions().is_empty());

    fixture.session.commit_update().unwrap();

    assert_eq!(
        fixture.session.regions_for_method(&statement_method(0)),
        vec![NonRemappableRegion::new(span(LEAF_SPAN.0, LEAF_SPAN.1), -1, false)]
    );
    assert_eq!(
        fixture.session.regions_for_method(&statement_method(1)),
        vec![
            NonRemappableRegion::new(span(CALLER_SPAN.0, CALLER_SPAN.1), 0, false),
            NonRemappableRegion::new(span(FINALLY_SPAN.0, FINALLY_SPAN.1), 0, true),
        ]
    );
    assert!(
        fixture
            .session
            .regions_for_method(&statement_method(0).next_version())
            .is_empty()
    );
}

#[tokio::test]
async fn test_recompiled_method_gets_active_statement_update() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(change_leaf_argument);

    let cancel = CancellationToken::new();
    let update = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &tokens(&[0]), &cancel)
        .await
        .unwrap();

    assert_eq!(
        update.active_statement_updates,
        vec![ActiveStatementUpdate {
            statement: ActiveStatementId(0),
            instruction: leaf_instruction(),
            new_span: span(LEAF_SPAN.0, LEAF_SPAN.1),
        }]
    );
    assert!(update.exception_region_updates.is_empty());
    assert!(
        update
            .appended_regions
            .iter()
            .all(|(method, _)| *method != statement_method(0))
    );

    fixture.session.commit_update().unwrap();
    assert!(fixture.session.regions_for_method(&statement_method(0)).is_empty());
}

#[tokio::test]
async fn test_recompiled_caller_reports_exception_region_delta() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(insert_line_in_main);

    let cancel = CancellationToken::new();
    let update = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &tokens(&[1]), &cancel)
        .await
        .unwrap();

    assert_eq!(
        update.active_statement_updates,
        vec![ActiveStatementUpdate {
            statement: ActiveStatementId(1),
            instruction: StatementDescription::for_ordinal(1).instruction(),
            new_span: span((7, 18), (7, 22)),
        }]
    );
    assert_eq!(
        update.exception_region_updates,
        vec![ExceptionRegionUpdate {
            method: statement_method(1).next_version(),
            statement: ActiveStatementId(1),
            region_index: 0,
            new_span: span((9, 16), (12, 9)),
            line_delta: 1,
        }]
    );

    fixture.session.commit_update().unwrap();
    assert_eq!(
        fixture.session.regions_for_method(&statement_method(0)),
        vec![NonRemappableRegion::new(span(LEAF_SPAN.0, LEAF_SPAN.1), 1, false)]
    );
    assert!(fixture.session.regions_for_method(&statement_method(1)).is_empty());
    assert!(
        fixture
            .session
            .regions_for_method(&statement_method(1).next_version())
            .is_empty()
    );
}

#[tokio::test]
async fn test_discarded_update_leaves_ledger_untouched() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(delete_blank_line);
    let before = fixture.session.non_remappable_regions();

    let cancel = CancellationToken::new();
    let update = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();
    assert_eq!(update.appended_regions.len(), 3);

    fixture.session.discard_update().unwrap();
    assert_eq!(*fixture.session.non_remappable_regions(), *before);
    assert_eq!(
        fixture.workspace.base_source_text(fixture.document).as_deref(),
        Some(fixture.source.text())
    );
    assert!(matches!(
        fixture.session.commit_update(),
        Err(EncError::NoPendingUpdate)
    ));
    assert!(fixture.session.module_readers().is_empty());
}

#[tokio::test]
async fn test_second_commit_in_same_break_appends_nothing() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(delete_blank_line);
    let cancel = CancellationToken::new();

    fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();
    fixture.session.commit_update().unwrap();
    let after_first = fixture.session.non_remappable_regions();

    let update = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();
    assert!(update.appended_regions.is_empty());
    fixture.session.commit_update().unwrap();

    assert_eq!(*fixture.session.non_remappable_regions(), *after_first);
    assert_eq!(
        fixture.session.regions_for_method(&statement_method(0)),
        vec![NonRemappableRegion::new(span(LEAF_SPAN.0, LEAF_SPAN.1), -1, false)]
    );
}

#[tokio::test]
async fn test_applied_recompile_is_not_reissued() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(change_leaf_argument);
    let cancel = CancellationToken::new();

    let first = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &tokens(&[0]), &cancel)
        .await
        .unwrap();
    assert_eq!(first.active_statement_updates.len(), 1);
    fixture.session.commit_update().unwrap();

    let second = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &tokens(&[0]), &cancel)
        .await
        .unwrap();
    assert!(second.active_statement_updates.is_empty());
    assert!(second.exception_region_updates.is_empty());
}

const MODULE_A: ModuleId = ModuleId(0xA);
const MODULE_B: ModuleId = ModuleId(0xB);

/// The leaf frame runs in module A, its caller in module B.
fn split_modules(id: usize) -> StatementDescription {
    StatementDescription::for_ordinal(id).with_module(if id == 0 { MODULE_A } else { MODULE_B })
}

#[tokio::test]
async fn test_updates_of_two_modules_commit_together() {
    let fixture = Fixture::with_descriptions(split_modules);
    fixture.session.start_edit_session().unwrap();
    fixture.edit(delete_blank_line);
    let cancel = CancellationToken::new();
    let method_a = split_modules(0).method();
    let method_b = split_modules(1).method();

    let a = fixture
        .session
        .prepare_update(MODULE_A, &HashSet::new(), &cancel)
        .await
        .unwrap();
    let b = fixture
        .session
        .prepare_update(MODULE_B, &HashSet::new(), &cancel)
        .await
        .unwrap();
    assert_eq!(a.appended_regions.len(), 1);
    assert_eq!(b.appended_regions.len(), 2);
    // B is computed on top of A's pending regions.
    assert_eq!(b.non_remappable_regions.get(&method_a).len(), 1);
    assert_eq!(
        fixture.session.edit_session().unwrap().pending_modules().unwrap(),
        vec![MODULE_A, MODULE_B]
    );

    fixture.session.commit_update().unwrap();

    assert_eq!(
        fixture.session.regions_for_method(&method_a),
        vec![NonRemappableRegion::new(span(LEAF_SPAN.0, LEAF_SPAN.1), -1, false)]
    );
    assert_eq!(fixture.session.regions_for_method(&method_b).len(), 2);
    assert_eq!(
        fixture.session.module_readers().modules(),
        vec![MODULE_A, MODULE_B]
    );
}

#[tokio::test]
async fn test_preparing_module_again_replaces_its_update() {
    let fixture = Fixture::with_descriptions(split_modules);
    fixture.session.start_edit_session().unwrap();
    fixture.edit(delete_blank_line);
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        fixture
            .session
            .prepare_update(MODULE_A, &HashSet::new(), &cancel)
            .await
            .unwrap();
    }
    fixture.session.commit_update().unwrap();

    assert_eq!(fixture.session.regions_for_method(&split_modules(0).method()).len(), 1);
    assert!(fixture.session.regions_for_method(&split_modules(1).method()).is_empty());
    assert_eq!(fixture.session.module_readers().modules(), vec![MODULE_A]);
}

#[tokio::test]
async fn test_ending_edit_session_discards_pending_update() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(delete_blank_line);

    let cancel = CancellationToken::new();
    fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();
    fixture.session.end_edit_session().unwrap();

    assert!(fixture.session.non_remappable_regions().is_empty());
    assert!(fixture.session.start_edit_session().is_ok());
}

#[tokio::test]
async fn test_regions_accumulate_across_edit_sessions() {
    let fixture = Fixture::new();
    let cancel = CancellationToken::new();

    fixture.session.start_edit_session().unwrap();
    fixture.edit(delete_blank_line);
    fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();
    fixture.session.commit_update().unwrap();
    fixture.session.end_edit_session().unwrap();
    let first = fixture.session.regions_for_method(&statement_method(0));

    // The commit made the edited text the baseline; the debugger now
    // reports against it too.
    let rebased = MarkedSource::parse(PATH, delete_blank_line(SOURCE)).unwrap();
    assert_eq!(
        fixture.workspace.base_source_text(fixture.document).as_deref(),
        Some(rebased.text())
    );
    fixture.debugger.set_active_statements(
        active_statement_debug_infos(std::slice::from_ref(&rebased), StatementDescription::for_ordinal).unwrap(),
    );

    fixture.session.start_edit_session().unwrap();
    fixture
        .workspace
        .edit_document(fixture.document, insert_line_in_main(rebased.text()));
    fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();
    fixture.session.commit_update().unwrap();

    let regions = fixture.session.regions_for_method(&statement_method(0));
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0], first[0]);
    assert_eq!(
        regions[1],
        NonRemappableRegion::new(span((15, 14), (15, 35)), 1, false)
    );
    assert_eq!(fixture.session.module_readers().modules(), vec![FIXTURE_MODULE]);
}

#[tokio::test]
async fn test_out_of_sync_document_suppresses_exception_regions() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    let cancel = CancellationToken::new();

    fixture
        .workspace
        .set_committed_state(fixture.document, enc_remap::workspace::CommittedDocumentState::OutOfSync);

    let regions = fixture.session.exception_regions(&cancel).await.unwrap();
    assert!(
        regions
            .entries()
            .iter()
            .all(|entry| entry.exception_regions.is_out_of_sync())
    );

    // Statements are still reported from the debugger's view.
    let base = fixture
        .session
        .base_active_statement_spans(&[fixture.document], &cancel)
        .await
        .unwrap();
    assert_eq!(base[0].len(), 2);

    let adjusted = fixture
        .session
        .adjusted_active_statement_spans(fixture.document, &enc_remap::active_statements::NoTrackingSpans, &cancel)
        .await
        .unwrap();
    assert!(adjusted.is_empty());

    fixture.workspace.set_committed_state(
        fixture.document,
        enc_remap::workspace::CommittedDocumentState::MatchesBuildOutput,
    );
    fixture.session.notify_document_state_changed(fixture.document);

    let regions = fixture.session.exception_regions(&cancel).await.unwrap();
    assert_eq!(regions.entries()[0].exception_regions.spans(), Some(&[][..]));
    assert_eq!(
        regions.entries()[1].exception_regions.spans(),
        Some(&[span(FINALLY_SPAN.0, FINALLY_SPAN.1)][..])
    );
}

#[tokio::test]
async fn test_out_of_sync_exception_regions_are_not_remapped() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture
        .workspace
        .set_committed_state(fixture.document, enc_remap::workspace::CommittedDocumentState::OutOfSync);
    fixture.edit(delete_blank_line);

    let cancel = CancellationToken::new();
    let update = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();

    assert!(update.appended_regions.is_empty());
}

#[tokio::test]
async fn test_adjusted_spans_follow_edits() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(insert_line_in_main);
    let cancel = CancellationToken::new();

    let adjusted = fixture
        .session
        .adjusted_active_statement_spans(fixture.document, &enc_remap::active_statements::NoTrackingSpans, &cancel)
        .await
        .unwrap();
    let spans: Vec<_> = adjusted.iter().map(|s| (s.id.0, s.span)).collect();
    assert_eq!(
        spans,
        vec![(0, span((17, 14), (17, 35))), (1, span((7, 18), (7, 22)))]
    );

    let base = fixture
        .session
        .base_active_statement_spans(&[fixture.document], &cancel)
        .await
        .unwrap();
    assert_eq!(base[0][0].span, span(LEAF_SPAN.0, LEAF_SPAN.1));
}

#[tokio::test]
async fn test_tracking_spans_take_precedence() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    let cancel = CancellationToken::new();

    let tracked = MarkedSource::parse(
        PATH,
        SOURCE.replace(
            "<AS:0>Console.WriteLine(1);</AS:0>",
            "<TS:0>Console.WriteLine(1);</TS:0>",
        ),
    )
    .unwrap();
    let provider = enc_remap::fixtures::tracking_spans(std::slice::from_ref(&tracked)).unwrap();
    let expected = tracked
        .line_span(tracked.markers().tracking_span(0).unwrap())
        .unwrap();

    let position = fixture
        .session
        .current_active_statement_position(&provider, &leaf_instruction(), &cancel)
        .await
        .unwrap();
    assert_eq!(position, Some(expected));
}

#[tokio::test]
async fn test_syntax_errors_yield_no_positions() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(|text| text.replacen("F();", "F(;", 1));
    let cancel = CancellationToken::new();

    let adjusted = fixture
        .session
        .adjusted_active_statement_spans(fixture.document, &enc_remap::active_statements::NoTrackingSpans, &cancel)
        .await
        .unwrap();
    assert!(adjusted.is_empty());

    let position = fixture
        .session
        .current_active_statement_position(
            &enc_remap::active_statements::NoTrackingSpans,
            &leaf_instruction(),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(position, None);
}

#[tokio::test]
async fn test_concurrent_first_access_builds_map_once() {
    let fixture = Fixture::with_latency(Some(Duration::from_millis(20)));
    fixture.session.start_edit_session().unwrap();
    let cancel = CancellationToken::new();
    let documents = [fixture.document];

    let (a, b, c) = tokio::join!(
        fixture.session.base_active_statement_spans(&documents, &cancel),
        fixture.session.base_active_statement_spans(&documents, &cancel),
        fixture.session.active_statements(&cancel),
    );

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(c.unwrap().len(), 2);
    assert_eq!(fixture.debugger.active_statement_requests(), 1);

    let (x, y) = tokio::join!(
        fixture.session.exception_regions(&cancel),
        fixture.session.exception_regions(&cancel),
    );
    assert!(Arc::ptr_eq(&x.unwrap(), &y.unwrap()));
}

#[tokio::test]
async fn test_cancellation_leaves_cache_empty() {
    let fixture = Fixture::with_latency(Some(Duration::from_millis(50)));
    fixture.session.start_edit_session().unwrap();

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    assert!(matches!(
        fixture.session.active_statements(&cancelled).await,
        Err(EncError::Cancelled)
    ));
    assert_eq!(fixture.debugger.active_statement_requests(), 0);

    let in_flight = CancellationToken::new();
    let (result, _) = tokio::join!(fixture.session.active_statements(&in_flight), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        in_flight.cancel();
    });
    assert!(matches!(result, Err(EncError::Cancelled)));
    assert_eq!(fixture.debugger.active_statement_requests(), 1);

    let fresh = CancellationToken::new();
    let map = fixture.session.active_statements(&fresh).await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(fixture.debugger.active_statement_requests(), 2);
}

#[tokio::test]
async fn test_unavailable_module_cannot_be_updated() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    let cancel = CancellationToken::new();

    fixture.debugger.set_availability(FIXTURE_MODULE, EncAvailabilityStatus::Optimized);
    let err = fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EncError::ModuleUnavailable {
            status: EncAvailabilityStatus::Optimized,
            ..
        }
    ));

    fixture.debugger.unload_module(FIXTURE_MODULE);
    assert_eq!(
        fixture.session.module_availability(FIXTURE_MODULE).await.unwrap(),
        EncAvailabilityStatus::ModuleNotLoaded
    );
}

#[tokio::test]
async fn test_session_lifecycle_errors() {
    let fixture = Fixture::new();
    let cancel = CancellationToken::new();

    assert!(matches!(
        fixture.session.active_statements(&cancel).await,
        Err(EncError::NoEditSession)
    ));
    fixture.session.start_edit_session().unwrap();
    assert!(matches!(
        fixture.session.start_edit_session(),
        Err(EncError::EditSessionInProgress)
    ));
    assert!(matches!(
        fixture.session.discard_update(),
        Err(EncError::NoPendingUpdate)
    ));
    fixture.session.end_edit_session().unwrap();
    assert!(matches!(
        fixture.session.end_edit_session(),
        Err(EncError::NoEditSession)
    ));
}

#[tokio::test]
async fn test_ending_debugging_session_releases_readers() {
    let fixture = Fixture::new();
    fixture.session.start_edit_session().unwrap();
    fixture.edit(delete_blank_line);
    let cancel = CancellationToken::new();
    fixture
        .session
        .prepare_update(FIXTURE_MODULE, &HashSet::new(), &cancel)
        .await
        .unwrap();
    fixture.session.commit_update().unwrap();
    assert_eq!(fixture.session.module_readers().len(), 1);

    let Fixture { session, .. } = fixture;
    let session = Arc::try_unwrap(session).expect("sole owner of the session");
    session.end();
}
