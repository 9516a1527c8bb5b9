use std::collections::HashMap;

use super::*;

fn document(page_count: usize, pages: &[(u32, &str)]) -> MemoryPageReader {
    let mut texts = vec![String::new(); page_count];
    for (page, text) in pages {
        texts[*page as usize - 1] = (*text).to_string();
    }
    MemoryPageReader::new(texts)
}

fn rules() -> SegmentationRules {
    SegmentationRules::new(HeuristicsConfig::default()).expect("default heuristics should compile")
}

fn plan_single_book(
    page_count: usize,
    key: &str,
    start_page: u32,
    toc_page: Option<u32>,
) -> Vec<BookPlan> {
    let config = BooksConfig {
        books: vec![BookConfig {
            key: key.to_string(),
            title: key.to_string(),
            start_page,
            toc_page,
        }],
        heuristics: HeuristicsConfig::default(),
    };
    config.plan(page_count).expect("single book should plan")
}

fn detect_chapters(reader: &MemoryPageReader, book: &BookPlan) -> Vec<ChapterBoundary> {
    let rules = rules();
    let strategy = BoundaryStrategy::for_book(book, reader, &rules);
    strategy
        .detect(reader, book, &rules)
        .expect("detection should succeed")
}

fn outline_entry(level: u32, title: &str, page: u32) -> OutlineEntry {
    OutlineEntry {
        level,
        title: title.to_string(),
        page,
    }
}

fn sarf_document() -> MemoryPageReader {
    document(
        200,
        &[
            (
                150,
                "Sarf Textbook\n\
                 TABLE OF CONTENTS\n\
                 Chapter 3 – The Verb ........ 160\n\
                 3.1 Past Tense ........ 161\n\
                 3.2 Verb Forms and\n\
                 Their Meanings ........ 171\n\
                 Exercises ........ 185\n\
                 Chapter 4 – Nouns ........ 190\n\
                 4.1 Gender ........ 191",
            ),
            (151, "Preface\nHow to use this book"),
            (160, "Chapter 3 – The Verb\nIntroduction to verbs"),
            (161, "3.1 Past Tense\nThe past tense describes completed action.\n161"),
            (165, "More on the past tense"),
            (171, "3.2 Verb Forms\nForm I is the base pattern."),
            (185, "Exercises\nConjugate the following verbs."),
            (190, "CHAPTER 4\n4.1 Gender\nMasculine and feminine nouns."),
        ],
    )
}

fn sarf_run() -> (AssembledRun, Vec<BookSegmentation>) {
    let reader = sarf_document();
    let plans = plan_single_book(reader.page_count(), "sarf_textbook", 151, Some(150));
    segment_books(&reader, &plans, &rules(), "dream_textbook_pdf").expect("segmentation should succeed")
}

fn assert_well_formed(run: &AssembledRun) {
    let by_id = run
        .units
        .iter()
        .map(|unit| (unit.id.as_str(), unit))
        .collect::<HashMap<&str, &Unit>>();
    assert_eq!(by_id.len(), run.units.len(), "unit ids must be unique");

    let mut siblings = HashMap::<Option<&str>, Vec<PageSpan>>::new();
    for unit in &run.units {
        let span = PageSpan::new(unit.start_page, unit.end_page);
        assert!(unit.start_page <= unit.end_page, "{} has an inverted range", unit.id);

        match unit.parent_id.as_deref() {
            None => assert_eq!(unit.unit_type, UnitType::Book),
            Some(parent_id) => {
                let parent = by_id
                    .get(parent_id)
                    .unwrap_or_else(|| panic!("parent {parent_id} should precede its child"));
                let expected_parent_type = match unit.unit_type {
                    UnitType::Chapter => UnitType::Book,
                    UnitType::Section => UnitType::Chapter,
                    UnitType::Book => panic!("book units have no parent"),
                };
                assert_eq!(parent.unit_type, expected_parent_type);
                assert!(
                    PageSpan::new(parent.start_page, parent.end_page).contains(span),
                    "{} escapes its parent range",
                    unit.id
                );
            }
        }

        siblings
            .entry(unit.parent_id.as_deref())
            .or_default()
            .push(span);
    }

    for spans in siblings.values_mut() {
        spans.sort_by_key(|span| span.start_page);
        for pair in spans.windows(2) {
            assert!(!pair[0].overlaps(pair[1]), "sibling ranges overlap: {pair:?}");
        }
    }

    for item in &run.items {
        assert!(by_id.contains_key(item.unit_id.as_str()));
        assert!(item.content.as_deref().is_some_and(|content| !content.is_empty()));
    }
}

fn table_counts(connection: &Connection) -> (i64, i64, i64) {
    (
        count_rows(connection, "SELECT COUNT(*) FROM ar_sources").expect("count sources"),
        count_rows(connection, "SELECT COUNT(*) FROM ar_grammar_units").expect("count units"),
        count_rows(connection, "SELECT COUNT(*) FROM ar_grammar_unit_items").expect("count items"),
    )
}

#[test]
fn canonicalize_collapses_whitespace_and_lowercases_ascii_only() {
    assert_eq!(
        canonicalize("  Chapter\t3   The VERB \n"),
        "chapter 3 the verb"
    );
    assert_eq!(canonicalize("باب   الفاعل"), "باب الفاعل");
}

#[test]
fn digest_is_sha256_hex_of_the_canonical_key() {
    assert_eq!(
        digest("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(digest("  ABC "), digest("abc"));
    assert_eq!(digest("x").len(), 64);
}

#[test]
fn unit_ids_follow_composite_keys() {
    assert_eq!(
        chapter_unit_id("sarf_textbook", 3),
        digest("GRAMUNIT|sarf_textbook|chapter|03")
    );
    assert_eq!(
        section_unit_id("sarf_textbook", "3.2"),
        digest("GRAMUNIT|sarf_textbook|section|3.2")
    );
    assert_eq!(book_unit_id("Nahw_Textbook"), book_unit_id("nahw_textbook"));
    assert_ne!(chapter_unit_id("nahw_textbook", 1), chapter_unit_id("sarf_textbook", 1));

    let unit_id = section_unit_id("sarf_textbook", "3.2");
    assert_eq!(item_id(&unit_id, 1), digest(&format!("GRAMITEM|{unit_id}|1")));
}

#[test]
fn clean_lines_drops_blank_lines_and_bare_page_numbers() {
    let lines = clean_lines("  Heading  \n\n 42 \n12a is kept\n   \nBody");
    assert_eq!(lines, vec!["Heading", "12a is kept", "Body"]);
    assert_eq!(heading_region("a\n\nb\n7\nc\nd", 2), "a b");
}

#[test]
fn extract_text_joins_pages_and_skips_empty_ones() {
    let reader = document(4, &[(1, "one\n1"), (2, "  \n3\n"), (3, "three\nmore")]);
    assert_eq!(
        extract_text(&reader, PageSpan::new(1, 4)),
        "one\nthree\nmore"
    );
    assert_eq!(extract_text(&reader, PageSpan::new(2, 2)), "");
    assert_eq!(extract_text(&reader, PageSpan::new(4, 9)), "");
}

#[test]
fn close_spans_ends_each_range_before_the_next_start() {
    let spans = close_spans(&[10, 15, 30], 40);
    assert_eq!(
        spans,
        vec![
            PageSpan::new(10, 14),
            PageSpan::new(15, 29),
            PageSpan::new(30, 40)
        ]
    );
    assert!(close_spans(&[], 40).is_empty());
}

#[test]
fn join_toc_entries_merges_wrapped_titles_and_ignores_stray_lines() {
    let patterns = TocPatterns::new().expect("toc patterns should compile");
    let lines = [
        "TABLE OF CONTENTS",
        "Chapter 1 – Nouns and",
        "Their Kinds ........ 7",
        "1.1 Gender ........ 8",
        "Appendix ........ 99",
        "2.1 Dangling entry with no leader",
    ]
    .iter()
    .map(|line| line.to_string())
    .collect::<Vec<String>>();

    let entries = join_toc_entries(&lines, &patterns);
    assert_eq!(
        entries,
        vec![
            "Chapter 1 – Nouns and Their Kinds ........ 7",
            "1.1 Gender ........ 8",
            "Appendix ........ 99",
        ]
    );
}

#[test]
fn parse_toc_entries_attributes_sections_to_latest_chapter() {
    let patterns = TocPatterns::new().expect("toc patterns should compile");
    let entries = [
        "0.1 Orphan ........ 2",
        "Chapter 1 – Nouns ........ 7",
        "1.1 Gender ........ 8",
        "Review Questions ........ 12",
        "Chapter 2 - Verbs ........ 15",
        "2.1 Past Tense ........ 16",
        "1.2.3 ........ 30",
    ]
    .iter()
    .map(|entry| entry.to_string())
    .collect::<Vec<String>>();

    let toc = parse_toc_entries(&entries, &patterns);

    assert_eq!(
        toc.chapters,
        vec![
            TocChapter {
                number: 1,
                title: "Nouns".to_string(),
                page: 7
            },
            TocChapter {
                number: 2,
                title: "Verbs".to_string(),
                page: 15
            },
        ]
    );
    assert_eq!(toc.sections.len(), 3);
    assert_eq!(toc.sections[0].chapter_number, 1);
    assert_eq!(toc.sections[0].number.as_deref(), Some("1.1"));
    assert_eq!(toc.sections[1].number, None);
    assert_eq!(toc.sections[1].title, "Review Questions");
    assert_eq!(toc.sections[2].chapter_number, 2);
    assert_eq!(toc.sections[2].page, 16);
    assert_eq!(toc.chapter_title(2), Some("Verbs"));
    assert_eq!(toc.sections_for(1).count(), 2);
}

#[test]
fn read_toc_lines_starts_at_marker_within_lookahead_window() {
    let reader = document(
        10,
        &[
            (2, "Copyright page"),
            (3, "Contents\nTABLE OF CONTENTS\nChapter 1 – Nouns ........ 9"),
            (4, "1.1 Gender ........ 10"),
            (7, "Chapter 9 – Beyond the window ........ 40"),
        ],
    );

    let lines = read_toc_lines(&reader, 2, &HeuristicsConfig::default());
    assert_eq!(
        lines,
        vec![
            "TABLE OF CONTENTS",
            "Chapter 1 – Nouns ........ 9",
            "1.1 Gender ........ 10",
        ]
    );

    let missing = read_toc_lines(&reader, 8, &HeuristicsConfig::default());
    assert!(missing.is_empty());
}

#[test]
fn toc_strategy_coalesces_chapter_pages_and_falls_back_for_titles() {
    let reader = document(
        20,
        &[
            (
                1,
                "TABLE OF CONTENTS\n\
                 Chapter 1 – From Contents ........ 3\n\
                 Chapter 2 – Verbal Sentence ........ 6",
            ),
            (3, "CHAPTER 1\nbody"),
            (4, "CHAPTER 1 – Nominal Sentence\nmore body"),
            (6, "CHAPTER 2 VOCABULARY\nwords"),
            (9, "CHAPTER 1 – Review\nagain"),
            (12, "CHAPTER 7\nlist"),
        ],
    );
    let plans = plan_single_book(reader.page_count(), "nahw_textbook", 3, Some(1));

    let chapters = detect_chapters(&reader, &plans[0]);
    let summary = chapters
        .iter()
        .map(|chapter| (chapter.number, chapter.title.as_str(), chapter.span))
        .collect::<Vec<_>>();

    assert_eq!(
        summary,
        vec![
            (1, "Nominal Sentence", PageSpan::new(3, 5)),
            (2, "Verbal Sentence", PageSpan::new(6, 11)),
            (7, "Chapter 7", PageSpan::new(12, 20)),
        ]
    );
    assert!(chapters.iter().all(|chapter| chapter.sections.is_empty()));
}

#[test]
fn section_search_requires_a_whole_number_match() {
    let reader = document(
        10,
        &[
            (
                1,
                "TABLE OF CONTENTS\n\
                 Chapter 1 – Nouns ........ 3\n\
                 1.2 The Definite Article ........ 5\n\
                 1.3 Missing Heading ........ 8",
            ),
            (3, "CHAPTER 1 – Nouns\nintro"),
            (4, "11.23 Drill\npractice"),
            (5, "1.2 The Definite Article\nbody"),
        ],
    );
    let plans = plan_single_book(reader.page_count(), "nahw_textbook", 2, Some(1));

    let chapters = detect_chapters(&reader, &plans[0]);
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].span, PageSpan::new(3, 10));
    assert_eq!(
        chapters[0].sections,
        vec![SectionBoundary {
            number: "1.2".to_string(),
            title: "The Definite Article".to_string(),
            span: PageSpan::new(5, 10),
        }]
    );
}

#[test]
fn sarf_book_closes_last_section_before_next_chapter() {
    let reader = sarf_document();
    let plans = plan_single_book(reader.page_count(), "sarf_textbook", 151, Some(150));
    let chapters = detect_chapters(&reader, &plans[0]);

    assert_eq!(chapters.len(), 2);
    let chapter_three = &chapters[0];
    assert_eq!(chapter_three.title, "The Verb");
    assert_eq!(chapter_three.span, PageSpan::new(160, 189));
    assert_eq!(
        chapter_three
            .sections
            .iter()
            .map(|section| (section.number.as_str(), section.span))
            .collect::<Vec<_>>(),
        vec![
            ("3.1", PageSpan::new(161, 170)),
            ("3.2", PageSpan::new(171, 189)),
        ]
    );
    assert_eq!(chapter_three.sections[1].title, "Verb Forms and Their Meanings");

    let chapter_four = &chapters[1];
    assert_eq!(chapter_four.title, "Nouns");
    assert_eq!(chapter_four.span, PageSpan::new(190, 200));
    assert_eq!(chapter_four.sections[0].span, PageSpan::new(190, 200));
}

#[test]
fn sarf_run_assembles_nested_units_and_section_items() {
    let (run, segmentations) = sarf_run();

    assert_eq!(run.count_units(UnitType::Book), 1);
    assert_eq!(run.count_units(UnitType::Chapter), 2);
    assert_eq!(run.count_units(UnitType::Section), 3);
    assert_eq!(run.items.len(), 3);
    assert_eq!(run.empty_items_skipped, 0);
    assert_well_formed(&run);

    let section_id = section_unit_id("sarf_textbook", "3.2");
    let section = run
        .units
        .iter()
        .find(|unit| unit.id == section_id)
        .expect("section 3.2 should be emitted");
    assert_eq!(section.parent_id, Some(chapter_unit_id("sarf_textbook", 3)));
    assert_eq!(section.order_index, Some(2));
    assert_eq!(
        section.meta,
        Some(json!({ "chapter_number": 3, "section_number": "3.2" }))
    );

    let item = run
        .items
        .iter()
        .find(|item| item.unit_id == section_id)
        .expect("section 3.2 should carry an item");
    assert_eq!(item.id, item_id(&section_id, 1));
    assert_eq!(
        item.content.as_deref(),
        Some("3.2 Verb Forms\nForm I is the base pattern.\nExercises\nConjugate the following verbs.")
    );

    let toc = segmentations[0].toc.as_ref().expect("toc strategy keeps entries");
    assert_eq!(segmentations[0].strategy, "toc");
    assert_eq!(toc.chapters.len(), 2);
    assert_eq!(toc.sections.len(), 4);
}

#[test]
fn segmentation_is_deterministic() {
    let source = Source::grammar_textbook("Dream Textbook", "dream_textbook_pdf");
    let render = || {
        let (run, _) = sarf_run();
        let mut script = SqlScriptStore::new();
        emit_run(&mut script, &source, &run).expect("emit should succeed");
        script.render()
    };

    assert_eq!(render(), render());
}

#[test]
fn outline_strategy_uses_bookmarks_within_the_book() {
    let reader = document(500, &[(418, "Figures of speech"), (455, "Metaphor")]).with_outline(vec![
        outline_entry(1, "Introduction", 400),
        outline_entry(1, "Chapter 1", 418),
        outline_entry(2, "Chapter 1 exercises", 430),
        outline_entry(1, "Chapter 2_Edited", 455),
        outline_entry(1, "Chapter 9", 0),
    ]);
    let plans = plan_single_book(reader.page_count(), "balagha", 418, None);
    assert_eq!(plans[0].detection, Detection::Outline);

    let (run, segmentations) =
        segment_books(&reader, &plans, &rules(), "dream_textbook_pdf").expect("segmentation should succeed");

    let chapters = &segmentations[0].chapters;
    assert_eq!(segmentations[0].strategy, "outline");
    assert!(segmentations[0].toc.is_none());
    assert_eq!(
        chapters
            .iter()
            .map(|chapter| (chapter.number, chapter.title.as_str(), chapter.span))
            .collect::<Vec<_>>(),
        vec![
            (1, "Chapter 1", PageSpan::new(418, 454)),
            (2, "Chapter 2", PageSpan::new(455, 500)),
        ]
    );
    assert_eq!(run.units.len(), 3);
    assert_eq!(run.items.len(), 2);
    assert_well_formed(&run);
}

#[test]
fn empty_ranges_keep_their_unit_but_emit_no_item() {
    let reader = document(500, &[(418, "Figures of speech")]).with_outline(vec![
        outline_entry(1, "Chapter 1", 418),
        outline_entry(1, "Chapter 2", 455),
    ]);
    let plans = plan_single_book(reader.page_count(), "balagha", 418, None);

    let (run, _) =
        segment_books(&reader, &plans, &rules(), "dream_textbook_pdf").expect("segmentation should succeed");

    assert_eq!(run.count_units(UnitType::Chapter), 2);
    assert_eq!(run.items.len(), 1);
    assert_eq!(run.empty_items_skipped, 1);
    assert!(
        run.items
            .iter()
            .all(|item| item.unit_id == chapter_unit_id("balagha", 1))
    );
}

#[test]
fn unit_ids_do_not_depend_on_titles() {
    let reader = document(20, &[(5, "body text")]);
    let plans = plan_single_book(reader.page_count(), "nahw_textbook", 1, Some(1));
    let chapter = |title: &str| ChapterBoundary {
        number: 1,
        title: title.to_string(),
        span: PageSpan::new(5, 20),
        sections: Vec::new(),
    };

    let mut first = AssembledRun::default();
    assemble_book(&reader, &plans[0], &[chapter("Nouns")], "src", &mut first);
    let mut second = AssembledRun::default();
    assemble_book(&reader, &plans[0], &[chapter("Renamed Nouns")], "src", &mut second);

    let ids = |run: &AssembledRun| {
        run.units
            .iter()
            .map(|unit| unit.id.clone())
            .chain(run.items.iter().map(|item| item.id.clone()))
            .collect::<Vec<String>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_ne!(first.units[1].title, second.units[1].title);
}

#[test]
fn builtin_config_chains_book_ranges() {
    let plans = BooksConfig::builtin()
        .plan(500)
        .expect("builtin layout should plan");

    let summary = plans
        .iter()
        .map(|plan| (plan.key.as_str(), plan.span, plan.detection))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("nahw_textbook", PageSpan::new(7, 150), Detection::Toc { toc_page: 4 }),
            ("sarf_textbook", PageSpan::new(151, 303), Detection::Toc { toc_page: 150 }),
            ("advanced_nahw", PageSpan::new(304, 359), Detection::Toc { toc_page: 303 }),
            (
                "advanced_structures",
                PageSpan::new(360, 417),
                Detection::Toc { toc_page: 359 }
            ),
            ("balagha", PageSpan::new(418, 500), Detection::Outline),
        ]
    );
}

#[test]
fn plan_rejects_invalid_layouts() {
    let book = |key: &str, start_page: u32, toc_page: Option<u32>| BookConfig {
        key: key.to_string(),
        title: key.to_string(),
        start_page,
        toc_page,
    };
    let config = |books: Vec<BookConfig>| BooksConfig {
        books,
        heuristics: HeuristicsConfig::default(),
    };

    assert!(config(Vec::new()).plan(100).is_err());
    assert!(config(vec![book("a", 1, None)]).plan(0).is_err());
    assert!(config(vec![book("a", 101, None)]).plan(100).is_err());
    assert!(config(vec![book("a", 0, None)]).plan(100).is_err());
    assert!(config(vec![book("a", 10, None), book("b", 10, None)]).plan(100).is_err());
    assert!(config(vec![book("a", 10, None), book("a", 20, None)]).plan(100).is_err());
    assert!(config(vec![book(" ", 10, None)]).plan(100).is_err());
    assert!(config(vec![book("a", 10, Some(101))]).plan(100).is_err());

    let error = config(vec![book("a", 50, None), book("b", 40, None)])
        .plan(100)
        .expect_err("decreasing start pages must fail");
    assert!(error.to_string().contains("must start after"));
}

#[test]
fn books_config_json_fills_heuristic_defaults() {
    let config: BooksConfig = serde_json::from_str(
        r#"{
            "books": [
                {"key": "nahw", "title": "Nahw", "start_page": 3, "toc_page": 1},
                {"key": "balagha", "title": "Balagha", "start_page": 40}
            ],
            "heuristics": {"chapter_marker": "LESSON"}
        }"#,
    )
    .expect("config should parse");

    assert_eq!(config.books[1].toc_page, None);
    assert_eq!(config.heuristics.chapter_marker, "LESSON");
    assert_eq!(config.heuristics.toc_marker, "TABLE OF CONTENTS");
    assert_eq!(config.heuristics.section_heading_lines, 8);

    let plans = config.plan(60).expect("config should plan");
    assert_eq!(plans[0].span, PageSpan::new(3, 39));
    assert_eq!(plans[1].span, PageSpan::new(40, 60));
}

#[test]
fn custom_chapter_marker_drives_heading_detection() {
    let heuristics = HeuristicsConfig {
        chapter_marker: "Lesson".to_string(),
        ..HeuristicsConfig::default()
    };
    let rules = SegmentationRules::new(heuristics).expect("custom heuristics should compile");
    let reader = document(
        10,
        &[
            (1, "TABLE OF CONTENTS"),
            (2, "LESSON 1 – Greetings\nhello"),
            (6, "Lesson 2 - Numbers\none two"),
        ],
    );
    let plans = plan_single_book(reader.page_count(), "primer", 2, Some(1));

    let strategy = BoundaryStrategy::for_book(&plans[0], &reader, &rules);
    let chapters = strategy
        .detect(&reader, &plans[0], &rules)
        .expect("detection should succeed");

    assert_eq!(
        chapters
            .iter()
            .map(|chapter| (chapter.number, chapter.title.as_str(), chapter.span))
            .collect::<Vec<_>>(),
        vec![
            (1, "Greetings", PageSpan::new(2, 5)),
            (2, "Numbers", PageSpan::new(6, 10)),
        ]
    );
}

#[test]
fn sql_script_replays_without_changing_row_counts() {
    let (run, _) = sarf_run();
    let source = Source::grammar_textbook("O'Brien's Grammar", "dream_textbook_pdf");
    let mut script = SqlScriptStore::new();
    let emitted = emit_run(&mut script, &source, &run).expect("emit should succeed");
    assert_eq!(emitted.sources, 1);
    assert_eq!(emitted.units, 6);
    assert_eq!(emitted.items, 3);
    assert_eq!(script.statement_count(), 2 + 6 + 3);

    let connection = Connection::open_in_memory().expect("in-memory DB should open");
    ensure_schema(&connection).expect("schema should initialize");

    let rendered = script.render();
    connection.execute_batch(&rendered).expect("script should apply");
    let first = table_counts(&connection);
    connection.execute_batch(&rendered).expect("script should replay");

    assert_eq!(first, (1, 6, 3));
    assert_eq!(table_counts(&connection), first);

    let title: String = connection
        .query_row("SELECT title FROM ar_sources", [], |row| row.get(0))
        .expect("source row should exist");
    assert_eq!(title, "O'Brien's Grammar");

    let unbound = count_rows(
        &connection,
        "SELECT COUNT(*) FROM ar_grammar_units WHERE source_id IS NULL",
    )
    .expect("count unbound units");
    assert_eq!(unbound, 0);
}

#[test]
fn sqlite_store_upserts_are_idempotent_and_refresh_the_source() {
    let (run, _) = sarf_run();
    let connection = Connection::open_in_memory().expect("in-memory DB should open");
    ensure_schema(&connection).expect("schema should initialize");

    let first_source = Source::grammar_textbook("Dream Textbook", "dream_textbook_pdf");
    emit_run(&mut SqliteStore::new(&connection), &first_source, &run).expect("first apply");
    let first = table_counts(&connection);

    let renamed = Source::grammar_textbook("Dream Textbook (2nd ed.)", "dream_textbook_pdf");
    emit_run(&mut SqliteStore::new(&connection), &renamed, &run).expect("second apply");

    assert_eq!(first, (1, 6, 3));
    assert_eq!(table_counts(&connection), first);

    let title: String = connection
        .query_row("SELECT title FROM ar_sources", [], |row| row.get(0))
        .expect("source row should exist");
    assert_eq!(title, "Dream Textbook (2nd ed.)");

    let bound = count_rows(
        &connection,
        "SELECT COUNT(*) FROM ar_grammar_units
         WHERE source_id = (SELECT id FROM ar_sources WHERE identifier = 'dream_textbook_pdf')",
    )
    .expect("count bound units");
    assert_eq!(bound, 6);

    let schema_version: String = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )
        .expect("schema version should be recorded");
    assert_eq!(schema_version, DB_SCHEMA_VERSION);
}

#[test]
fn parse_pdfinfo_page_count_reads_pages_line() {
    let stdout = "Title:          Dream Textbook\nPages:          512\nEncrypted:      no\n";
    assert_eq!(parse_pdfinfo_page_count(stdout), Some(512));
    assert_eq!(parse_pdfinfo_page_count("Title: x\n"), None);
}

#[test]
fn split_pdftotext_pages_keeps_blank_pages_but_not_the_trailing_feed() {
    assert_eq!(split_pdftotext_pages("one\u{000C}two\u{000C}"), vec!["one", "two"]);
    assert_eq!(
        split_pdftotext_pages("one\u{000C}\u{000C}thr\u{0000}ee\u{000C}"),
        vec!["one", "", "three"]
    );
}

#[test]
fn parse_outline_xml_tracks_nesting_and_decodes_entities() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<pdf2xml producer="poppler" version="23.02.0">
<outline>
<item page="418">Chapter 1</item>
<outline>
<item page="420">1.1 Tashbih &amp; Isti&apos;ara</item>
</outline>
<item page="455">Chapter  2_Edited</item>
</outline>
<page number="1" position="absolute" top="0" left="0" height="1188" width="918">
</page>
</pdf2xml>"#;

    let entries = parse_outline_xml(xml).expect("outline should parse");
    assert_eq!(
        entries,
        vec![
            outline_entry(1, "Chapter 1", 418),
            outline_entry(2, "1.1 Tashbih & Isti'ara", 420),
            outline_entry(1, "Chapter 2_Edited", 455),
        ]
    );
}
