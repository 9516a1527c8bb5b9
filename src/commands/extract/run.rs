use super::*;

#[derive(Debug, Serialize)]
struct BoundaryReport<'a> {
    report_version: u32,
    run_id: &'a str,
    generated_at: String,
    source_identifier: &'a str,
    page_count: usize,
    books: &'a [BookSegmentation],
}

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("extract-{}", utc_compact_string(started_ts));

    if !args.pdf.is_file() {
        bail!("PDF not found: {}", args.pdf.display());
    }

    info!(
        pdf = %args.pdf.display(),
        source_identifier = %args.source_identifier,
        run_id = %run_id,
        "starting extraction"
    );

    let config = BooksConfig::load(args.books_config.as_deref())?;
    let rules = SegmentationRules::new(config.heuristics.clone())?;
    let tool_versions = collect_tool_versions()?;
    let source_sha256 = sha256_file(&args.pdf)?;

    // The reader is the only handle on the document and is dropped when this
    // function returns, on success or error.
    let reader = PopplerPageReader::open(&args.pdf)?;
    let plans = config.plan(reader.page_count())?;

    let (assembled, segmentations) =
        segment_books(&reader, &plans, &rules, &args.source_identifier)?;

    let source = Source::grammar_textbook(&args.source_title, &args.source_identifier);
    let mut script = SqlScriptStore::new();
    let emitted = emit_run(&mut script, &source, &assembled)?;

    let mut counts = summarize_counts(reader.page_count(), &plans, &segmentations, &assembled);
    counts.statements_emitted = script.statement_count();
    let mut warnings = collect_warnings(&segmentations);

    if args.dry_run {
        info!(
            units = emitted.units,
            items = emitted.items,
            statements = counts.statements_emitted,
            "dry-run complete; nothing written"
        );
        return Ok(());
    }

    write_text(&args.out, &script.render())?;
    info!(path = %args.out.display(), statements = counts.statements_emitted, "wrote upsert script");

    if let Some(db_path) = args.db_path.as_deref() {
        apply_to_database(db_path, &source, &assembled)?;
    }

    if let Some(report_path) = args.boundaries_report_path.as_deref() {
        let report = BoundaryReport {
            report_version: 1,
            run_id: &run_id,
            generated_at: now_utc_string(),
            source_identifier: &args.source_identifier,
            page_count: reader.page_count(),
            books: &segmentations,
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote boundary report");
    }

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.out
            .with_file_name(format!("extract_run_{}.json", utc_compact_string(started_ts)))
    });

    if tool_versions.pdftohtml.is_none()
        && plans
            .iter()
            .any(|plan| matches!(plan.detection, Detection::Outline))
    {
        warnings.push("pdftohtml version unavailable while outline detection was used".to_string());
    }

    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_extract_command(&args),
        source_identifier: args.source_identifier.clone(),
        source_title: args.source_title.clone(),
        source_sha256,
        tool_versions,
        paths: ExtractPaths {
            pdf_path: args.pdf.display().to_string(),
            sql_out_path: Some(args.out.display().to_string()),
            db_path: args.db_path.as_ref().map(|path| path.display().to_string()),
            boundaries_report_path: args
                .boundaries_report_path
                .as_ref()
                .map(|path| path.display().to_string()),
        },
        counts,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote extract run manifest");

    info!(
        units = emitted.units,
        items = emitted.items,
        out = %args.out.display(),
        "extraction completed"
    );

    Ok(())
}

fn apply_to_database(db_path: &Path, source: &Source, assembled: &AssembledRun) -> Result<()> {
    let mut connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let tx = connection.transaction()?;
    let emitted = {
        let mut store = SqliteStore::new(&tx);
        emit_run(&mut store, source, assembled)?
    };
    tx.commit()?;

    let units_total = count_rows(&connection, "SELECT COUNT(*) FROM ar_grammar_units")?;
    let items_total = count_rows(&connection, "SELECT COUNT(*) FROM ar_grammar_unit_items")?;
    info!(
        path = %db_path.display(),
        sources_upserted = emitted.sources,
        units_upserted = emitted.units,
        items_upserted = emitted.items,
        units_total,
        items_total,
        "applied upserts to database"
    );

    Ok(())
}

fn summarize_counts(
    page_count: usize,
    plans: &[BookPlan],
    segmentations: &[BookSegmentation],
    assembled: &AssembledRun,
) -> ExtractCounts {
    let toc_entries = segmentations
        .iter()
        .filter_map(|segmentation| segmentation.toc.as_ref());

    let mut counts = ExtractCounts {
        page_count,
        book_count: plans.len(),
        units_total: assembled.units.len(),
        book_units: assembled.count_units(UnitType::Book),
        chapter_units: assembled.count_units(UnitType::Chapter),
        section_units: assembled.count_units(UnitType::Section),
        items_total: assembled.items.len(),
        empty_items_skipped: assembled.empty_items_skipped,
        ..ExtractCounts::default()
    };

    for toc in toc_entries {
        counts.toc_chapter_entries += toc.chapters.len();
        counts.toc_section_entries += toc.sections.len();
        counts.unnumbered_sections_skipped += toc
            .sections
            .iter()
            .filter(|section| section.number.is_none())
            .count();
    }

    counts
}

fn collect_warnings(segmentations: &[BookSegmentation]) -> Vec<String> {
    let mut warnings = Vec::new();

    for segmentation in segmentations {
        let key = &segmentation.book.key;
        if segmentation.chapters.is_empty() {
            warnings.push(format!(
                "no chapters detected for {} using {} strategy",
                key, segmentation.strategy
            ));
        }

        let Some(toc) = segmentation.toc.as_ref() else {
            continue;
        };
        if toc.chapters.is_empty() && toc.sections.is_empty() {
            warnings.push(format!("table of contents for {} yielded no entries", key));
        }

        let detected = segmentation
            .chapters
            .iter()
            .map(|chapter| chapter.number)
            .collect::<HashSet<u32>>();
        let missing = toc
            .chapters
            .iter()
            .filter(|chapter| !detected.contains(&chapter.number))
            .map(|chapter| chapter.number.to_string())
            .collect::<Vec<String>>();
        if !missing.is_empty() {
            warnings.push(format!(
                "toc chapters without a detected heading in {}: {}",
                key,
                missing.join(", ")
            ));
        }
    }

    warnings
}

fn render_extract_command(args: &ExtractArgs) -> String {
    let mut command = vec![
        "gramseg".to_string(),
        "extract".to_string(),
        "--pdf".to_string(),
        args.pdf.display().to_string(),
        "--out".to_string(),
        args.out.display().to_string(),
        "--source-title".to_string(),
        format!("{:?}", args.source_title),
        "--source-identifier".to_string(),
        args.source_identifier.clone(),
    ];

    if let Some(path) = &args.books_config {
        command.push("--books-config".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.boundaries_report_path {
        command.push("--boundaries-report-path".to_string());
        command.push(path.display().to_string());
    }
    if args.dry_run {
        command.push("--dry-run".to_string());
    }

    command.join(" ")
}
