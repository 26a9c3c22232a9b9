mod common;

use common::Workspace;
use std::sync::Arc;
use stylescope_core::analysis::{DiagnosticKind, DiagnosticStore, Severity};
use stylescope_core::document::TextDocument;
use stylescope_core::model::{Position, TextRange};

const MODULE: &str = ".container {\n  display: flex;\n}\n";

fn script(ws: &Workspace, body: &str) -> TextDocument {
    TextDocument::new(ws.path("src/App.tsx"), body, 1)
}

#[tokio::test]
async fn test_defined_class_has_no_diagnostics() {
    let ws = Workspace::new();
    ws.write("src/App.module.css", MODULE);
    let engine = ws.engine(Arc::new(DiagnosticStore::new()));

    let doc = script(
        &ws,
        "import styles from './App.module.css';\nconst c = styles.container;\n",
    );
    assert!(engine.check_document(&doc).is_empty());
}

#[tokio::test]
async fn test_undefined_class_is_reported_at_identifier() {
    let ws = Workspace::new();
    ws.write("src/App.module.css", MODULE);
    let engine = ws.engine(Arc::new(DiagnosticStore::new()));

    let doc = script(
        &ws,
        "import styles from './App.module.css';\nconst c = styles.missing;\n",
    );
    let diagnostics = engine.check_document(&doc);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UndefinedClass);
    assert_eq!(diagnostics[0].severity(), Severity::Warning);
    assert_eq!(
        diagnostics[0].range,
        TextRange::new(Position::new(1, 17), Position::new(1, 24))
    );
    assert!(diagnostics[0].message.contains("missing"));
}

#[tokio::test]
async fn test_undefined_class_after_jsx_closing_tag() {
    let ws = Workspace::new();
    ws.write("src/App.module.css", ".link {}\n");
    let engine = ws.engine(Arc::new(DiagnosticStore::new()));

    let doc = script(
        &ws,
        "import styles from './App.module.css';\n\
         const el = <li><a className={styles.link}>x</a> <span className={styles.missing}>y</span></li>;\n",
    );
    let diagnostics = engine.check_document(&doc);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UndefinedClass);
    assert!(diagnostics[0].message.contains("missing"));
}

#[tokio::test]
async fn test_undefined_class_after_self_closing_tag() {
    let ws = Workspace::new();
    ws.write("src/App.module.css", ".a {}\n");
    let engine = ws.engine(Arc::new(DiagnosticStore::new()));

    let doc = script(
        &ws,
        "import styles from './App.module.css';\n\
         const el = <><img className={styles.a} /><b className={styles.missing} /></>;\n",
    );
    let diagnostics = engine.check_document(&doc);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("missing"));
}

#[tokio::test]
async fn test_subtraction_is_not_a_hyphenated_class() {
    let ws = Workspace::new();
    ws.write("src/App.module.css", ".gap {}\n");
    let engine = ws.engine(Arc::new(DiagnosticStore::new()));

    let doc = script(
        &ws,
        "import styles from './App.module.css';\nconst w = styles.gap-1;\n",
    );
    assert!(engine.check_document(&doc).is_empty());
}

#[tokio::test]
async fn test_missing_module_is_reported_at_specifier() {
    let ws = Workspace::new();
    let engine = ws.engine(Arc::new(DiagnosticStore::new()));

    let doc = script(
        &ws,
        "import styles from './missing.module.css';\nconst c = styles.anything;\n",
    );
    let diagnostics = engine.check_document(&doc);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::ModuleNotFound);
    assert_eq!(diagnostics[0].severity(), Severity::Error);
    assert_eq!(
        diagnostics[0].range,
        TextRange::new(Position::new(0, 20), Position::new(0, 40))
    );
}

#[tokio::test]
async fn test_usages_in_strings_and_comments_are_ignored() {
    let ws = Workspace::new();
    ws.write("src/App.module.css", MODULE);
    let engine = ws.engine(Arc::new(DiagnosticStore::new()));

    let doc = script(
        &ws,
        "import styles from './App.module.css';\n\
         const a = 'styles.missing';\n\
         // styles.missing\n\
         /* styles.missing */\n\
         const b = `styles.missing`;\n",
    );
    assert!(engine.check_document(&doc).is_empty());
}

#[tokio::test]
async fn test_import_inside_comment_is_not_checked() {
    let ws = Workspace::new();
    let engine = ws.engine(Arc::new(DiagnosticStore::new()));

    let doc = script(&ws, "// import styles from './gone.module.css';\n");
    assert!(engine.check_document(&doc).is_empty());
}

#[tokio::test]
async fn test_alias_imports_resolve() {
    let ws = Workspace::new();
    ws.write("src/styles/theme.module.scss", ".card {\n  // .ghost {}\n  &.active {}\n}\n");
    let mut config = common::fast_config();
    config
        .aliases
        .insert("@styles/".to_string(), "src/styles".to_string());
    let engine = ws.engine_with(
        config,
        Arc::new(DiagnosticStore::new()),
        Arc::new(stylescope_core::content::FsContentSource),
    );

    let doc = script(
        &ws,
        "import theme from '@styles/theme.module.scss';\ntheme.card; theme.active; theme.ghost;\n",
    );
    let diagnostics = engine.check_document(&doc);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("ghost"));
}

#[tokio::test]
async fn test_queued_analysis_publishes_replacing_set() {
    let ws = Workspace::new();
    ws.write("src/App.module.css", MODULE);
    let sink = Arc::new(DiagnosticStore::new());
    let engine = ws.engine(sink.clone());
    let path = ws.write(
        "src/App.tsx",
        "import styles from './App.module.css';\nstyles.a; styles.b;\n",
    );

    engine.on_document_opened(&TextDocument::new(path.clone(), std::fs::read_to_string(&path).unwrap(), 1));
    engine.wait_for_analysis().await;
    assert_eq!(sink.get(&path).len(), 2);

    std::fs::write(&path, "import styles from './App.module.css';\nstyles.container;\n").unwrap();
    engine.on_document_changed(&TextDocument::new(path.clone(), std::fs::read_to_string(&path).unwrap(), 2));
    engine.wait_for_analysis().await;
    assert!(sink.get(&path).is_empty());
    assert!(sink.contains(&path));
}
