mod common;

use assert2::{check, let_assert};
use common::{DocProject, MappingWriter, TempWorkspace, gzip};
use texsync::synctex::{BlockKind, InputName};
use texsync::{DocumentIndex, SyncError, load_mapping};

fn chapter_mapping() -> String {
    MappingWriter::new()
        .input(1, "main.tex")
        .input(2, "chapter.tex")
        .offset(72.0, -72.0)
        .open_page(1)
        .open_hbox(1, 3, 90.0, 150.0, 300.0, 12.0)
        .element('x', 1, 3, 90.0, 150.0, None)
        .element('g', 1, 3, 120.0, 150.0, Some(4.0))
        .element('k', 1, 3, 130.0, 150.0, Some(-1.0))
        .close_hbox()
        .close_page(1)
        .open_page(2)
        .open_hbox(2, 7, 90.0, 400.0, 300.0, 10.0)
        .element('$', 2, 7, 110.0, 400.0, None)
        .close_hbox()
        .close_page(2)
        .build()
}

/// The compressed form decodes to the same index as the plain form.
#[test]
fn gzip_and_plain_bodies_are_equivalent() {
    let body = chapter_mapping();
    let plain = DocumentIndex::parse(body.as_bytes()).unwrap();
    let compressed = DocumentIndex::parse(&gzip(body.as_bytes())).unwrap();
    check!(plain == compressed);
}

#[test]
fn parse_groups_blocks_by_input_line_and_page() {
    let index = DocumentIndex::parse(chapter_mapping().as_bytes()).unwrap();

    check!(index.version() == "1");
    check!(index.page_count() == 2);
    check!((index.offset().x - 72.0).abs() < 1e-4);
    check!((index.offset().y + 72.0).abs() < 1e-4);

    let names: Vec<_> = index.input_names().cloned().collect();
    check!(names == [InputName::from("main.tex"), InputName::from("chapter.tex")]);

    let main = index.lines(&"main.tex".into()).unwrap();
    let blocks = &main[&3][&1];
    let kinds: Vec<_> = blocks.iter().map(|b| b.kind).collect();
    check!(kinds == [BlockKind::Current, BlockKind::Glue, BlockKind::Kern]);
    check!(blocks.iter().all(|b| (b.height - 12.0).abs() < 1e-4));

    let chapter = index.lines(&"chapter.tex".into()).unwrap();
    check!(chapter[&7].keys().copied().collect::<Vec<_>>() == [2]);
    check!(chapter[&7][&2][0].kind == BlockKind::Math);
}

#[test]
fn compressed_mapping_file_is_found() {
    let workspace = TempWorkspace::new();
    let tex = workspace.create_file("doc.tex", "");
    workspace.create_file("doc.synctex.gz", gzip(DocProject::mapping(&tex).as_bytes()));

    let index = load_mapping(&workspace.join("doc.pdf")).unwrap();
    check!(index.lines(&InputName::from(tex.display().to_string().as_str())).is_some());
}

#[test]
fn missing_mapping_file_is_reported_with_both_candidates() {
    let workspace = TempWorkspace::new();
    workspace.create_file("doc.pdf", "");

    let_assert!(
        Err(SyncError::MissingMappingFile { plain, compressed }) =
            load_mapping(&workspace.join("doc.pdf"))
    );
    check!(plain == workspace.join("doc.synctex"));
    check!(compressed == workspace.join("doc.synctex.gz"));
}

#[test]
fn truncated_body_is_corrupt() {
    let workspace = TempWorkspace::new();
    let body = gzip(chapter_mapping().as_bytes());
    workspace.create_file("doc.synctex.gz", &body[..body.len() / 2]);

    let_assert!(
        Err(SyncError::CorruptMappingFile { path, .. }) = load_mapping(&workspace.join("doc.pdf"))
    );
    check!(path == workspace.join("doc.synctex.gz"));
}
