use serde_json::json;
use std::path::{Path, PathBuf};
use stylescope_core::model::TextRange;
use stylescope_core::StylescopeEngine;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct ClassView {
    pub class: String,
    pub occurrences: usize,
    pub first: String,
}

#[derive(Tabled)]
pub struct RangeView {
    pub class: String,
    pub start: String,
    pub end: String,
}

#[derive(Tabled)]
pub struct DependentView {
    pub dependent: String,
}

fn location(range: &TextRange) -> (String, String) {
    (
        format!("{}:{}", range.start.line + 1, range.start.character + 1),
        format!("{}:{}", range.end.line + 1, range.end.character + 1),
    )
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

pub async fn run(
    path: PathBuf,
    module: PathBuf,
    class: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = std::fs::canonicalize(&path)?;
    let module = if module.is_absolute() {
        module
    } else {
        root.join(module)
    };

    let engine = StylescopeEngine::builder(root.clone()).build();
    engine.initialize().await?;

    let names = match &class {
        Some(name) => vec![name.clone()],
        None => engine.class_names_of(&module),
    };
    let dependents = engine.dependents_of(&module);

    if json {
        let classes: serde_json::Map<String, serde_json::Value> = names
            .iter()
            .map(|name| {
                let ranges = engine.ranges_of(&module, name);
                (name.clone(), json!(ranges))
            })
            .collect();
        let out = json!({
            "module": module,
            "classes": classes,
            "dependents": dependents,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        match &class {
            Some(name) => {
                if !engine.has_class(&module, name) {
                    println!("Class \"{}\" is not defined in {}", name, display_path(&root, &module));
                }
                let views: Vec<RangeView> = engine
                    .ranges_of(&module, name)
                    .iter()
                    .map(|range| {
                        let (start, end) = location(range);
                        RangeView {
                            class: name.clone(),
                            start,
                            end,
                        }
                    })
                    .collect();
                println!("{}", Table::new(&views).with(Style::psql()));
            }
            None => {
                let views: Vec<ClassView> = names
                    .iter()
                    .map(|name| {
                        let ranges = engine.ranges_of(&module, name);
                        ClassView {
                            class: name.clone(),
                            occurrences: ranges.len(),
                            first: ranges
                                .first()
                                .map(|r| location(r).0)
                                .unwrap_or_else(|| "-".to_string()),
                        }
                    })
                    .collect();
                println!("{}", Table::new(&views).with(Style::psql()));
            }
        }

        let views: Vec<DependentView> = dependents
            .iter()
            .map(|p| DependentView {
                dependent: display_path(&root, p),
            })
            .collect();
        println!("{}", Table::new(&views).with(Style::psql()));
    }

    engine.shutdown().await;
    Ok(())
}
