use super::*;

const CONTENT_ITEM_SEQUENCE: u32 = 1;

/// Units and items of one run, parents always ahead of their children.
#[derive(Debug, Default, Clone)]
pub(super) struct AssembledRun {
    pub(super) units: Vec<Unit>,
    pub(super) items: Vec<Item>,
    pub(super) empty_items_skipped: usize,
}

impl AssembledRun {
    pub(super) fn count_units(&self, unit_type: UnitType) -> usize {
        self.units
            .iter()
            .filter(|unit| unit.unit_type == unit_type)
            .count()
    }

    fn push_content_item(
        &mut self,
        reader: &dyn PageReader,
        unit_id: &str,
        title: &str,
        span: PageSpan,
    ) {
        let content = extract_text(reader, span);
        if content.is_empty() {
            self.empty_items_skipped += 1;
            debug!(
                unit_id,
                start_page = span.start_page,
                end_page = span.end_page,
                "no text in range; item omitted"
            );
            return;
        }

        self.items.push(Item {
            id: item_id(unit_id, CONTENT_ITEM_SEQUENCE),
            unit_id: unit_id.to_string(),
            item_type: ItemType::Content,
            title: title.to_string(),
            content: Some(content),
            content_ar: None,
            order_index: CONTENT_ITEM_SEQUENCE,
            meta: None,
        });
    }
}

/// Appends the book unit, its chapters and sections, and their content
/// items. A chapter without detected sections carries its own item.
pub(super) fn assemble_book(
    reader: &dyn PageReader,
    book: &BookPlan,
    chapters: &[ChapterBoundary],
    source_identifier: &str,
    run: &mut AssembledRun,
) {
    let book_id = book_unit_id(&book.key);
    run.units.push(Unit {
        id: book_id.clone(),
        parent_id: None,
        unit_type: UnitType::Book,
        order_index: None,
        title: book.title.clone(),
        title_ar: None,
        source_identifier: source_identifier.to_string(),
        start_page: book.span.start_page,
        end_page: book.span.end_page,
        meta: Some(json!({ "book_key": book.key })),
    });

    for chapter in chapters {
        let chapter_id = chapter_unit_id(&book.key, chapter.number);
        run.units.push(Unit {
            id: chapter_id.clone(),
            parent_id: Some(book_id.clone()),
            unit_type: UnitType::Chapter,
            order_index: Some(chapter.number),
            title: chapter.title.clone(),
            title_ar: None,
            source_identifier: source_identifier.to_string(),
            start_page: chapter.span.start_page,
            end_page: chapter.span.end_page,
            meta: Some(json!({ "chapter_number": chapter.number })),
        });

        if chapter.sections.is_empty() {
            run.push_content_item(reader, &chapter_id, &chapter.title, chapter.span);
            continue;
        }

        for (position, section) in chapter.sections.iter().enumerate() {
            let section_id = section_unit_id(&book.key, &section.number);
            run.units.push(Unit {
                id: section_id.clone(),
                parent_id: Some(chapter_id.clone()),
                unit_type: UnitType::Section,
                order_index: Some(position as u32 + 1),
                title: section.title.clone(),
                title_ar: None,
                source_identifier: source_identifier.to_string(),
                start_page: section.span.start_page,
                end_page: section.span.end_page,
                meta: Some(json!({
                    "chapter_number": chapter.number,
                    "section_number": section.number,
                })),
            });

            run.push_content_item(reader, &section_id, &section.title, section.span);
        }
    }
}

/// Per-book detection result kept for the boundary report.
#[derive(Debug, Clone, Serialize)]
pub(super) struct BookSegmentation {
    pub(super) book: BookPlan,
    pub(super) strategy: &'static str,
    pub(super) toc: Option<TocEntries>,
    pub(super) chapters: Vec<ChapterBoundary>,
}

/// Runs detection and assembly for every planned book in order.
pub(super) fn segment_books(
    reader: &dyn PageReader,
    plans: &[BookPlan],
    rules: &SegmentationRules,
    source_identifier: &str,
) -> Result<(AssembledRun, Vec<BookSegmentation>)> {
    let mut run = AssembledRun::default();
    let mut segmentations = Vec::with_capacity(plans.len());

    for book in plans {
        let strategy = BoundaryStrategy::for_book(book, reader, rules);
        let chapters = strategy
            .detect(reader, book, rules)
            .with_context(|| format!("boundary detection failed for {}", book.key))?;

        let units_before = run.units.len();
        let items_before = run.items.len();
        assemble_book(reader, book, &chapters, source_identifier, &mut run);

        info!(
            book = %book.key,
            strategy = strategy.name(),
            start_page = book.span.start_page,
            end_page = book.span.end_page,
            chapters = chapters.len(),
            sections = chapters.iter().map(|chapter| chapter.sections.len()).sum::<usize>(),
            units = run.units.len() - units_before,
            items = run.items.len() - items_before,
            "segmented book"
        );
        if chapters.is_empty() {
            warn!(book = %book.key, strategy = strategy.name(), "no chapters detected");
        }

        segmentations.push(BookSegmentation {
            book: book.clone(),
            strategy: strategy.name(),
            toc: strategy.toc().cloned(),
            chapters,
        });
    }

    Ok((run, segmentations))
}
