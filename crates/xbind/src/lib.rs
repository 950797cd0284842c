//! xbind command-line front end.
//!
//! Loads a JSON mapping, binds one of its types to an XML document, and
//! reads or writes properties through the adapter:
//!
//! ```text
//! xbind --mapping orders.json --document order.xml --type Order get Customer
//! xbind --mapping orders.json --document order.xml --type Order set Lines a,b,c
//! xbind --mapping orders.json --type Order dump
//! ```

pub mod config;

use std::io::Write;
use std::rc::Rc;

use anyhow::{Context, bail};
use tracing::{debug, info};
use xbind_adapter::{
    AccessorKind, AdaptedObject, Mapping, ObservableList, PropertyDescriptor, PropertyType,
    PropertyValue, XmlAdapter,
};
use xbind_node::XmlDocument;

pub use config::{CliConfig, Command};

/// Initializes the tracing subscriber. `RUST_LOG` overrides `level`.
///
/// Logs go to standard error so command output stays clean.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "xbind={},xbind_adapter={},xbind_node={}",
            level, level, level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Runs the configured command, writing its output to `out`.
pub fn run(config: &CliConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let mapping = Mapping::from_path(&config.mapping)
        .with_context(|| format!("Failed to load mapping '{}'", config.mapping.display()))?;

    let document = load_document(config)?;
    let (object, adapter) = mapping
        .create(&config.type_name, document.clone(), config.adapter_config())
        .with_context(|| format!("Failed to bind type '{}'", config.type_name))?;

    info!(
        type_name = %config.type_name,
        backend = %config.backend,
        "Bound document"
    );

    match &config.command {
        Command::Get { property } => {
            descriptor(&object, property)?;
            if let Some(value) = object.get(property)? {
                writeln!(out, "{}", value)?;
            }
        }
        Command::Set {
            property,
            value,
            output,
        } => {
            let descriptor = descriptor(&object, property)?;
            let parsed = parse_value(&descriptor, value)?;
            debug!(property = %property, value = ?parsed, "Assigning property");

            let accepted = match parsed {
                Some(value) => object.set(property, value)?,
                None => object.clear(property)?,
            };
            if !accepted {
                bail!("Assignment to '{}' was rejected", property);
            }

            let xml = document.to_xml_string()?;
            match output {
                Some(path) => std::fs::write(path, xml)
                    .with_context(|| format!("Failed to write '{}'", path.display()))?,
                None => writeln!(out, "{}", xml)?,
            }
        }
        Command::Dump => dump(&object, &adapter, out)?,
    }

    Ok(())
}

fn load_document(config: &CliConfig) -> anyhow::Result<XmlDocument> {
    match &config.document {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read document '{}'", path.display()))?;
            XmlDocument::parse(&text, config.backend)
                .with_context(|| format!("Failed to parse document '{}'", path.display()))
        }
        None => Ok(XmlDocument::new(config.backend)),
    }
}

fn descriptor(object: &AdaptedObject, property: &str) -> anyhow::Result<Rc<PropertyDescriptor>> {
    match object.type_descriptor().property(property) {
        Some(descriptor) => Ok(descriptor.clone()),
        None => bail!(
            "Type '{}' has no property '{}'",
            object.type_descriptor().name(),
            property
        ),
    }
}

/// Parses command-line text for `property`. Empty text clears.
fn parse_value(property: &PropertyDescriptor, text: &str) -> anyhow::Result<Option<PropertyValue>> {
    if text.is_empty() {
        return Ok(None);
    }

    match property.property_type() {
        PropertyType::List(item) => {
            let mut items = Vec::new();
            for part in text.split(',') {
                match item.parse_text(property.name(), part.trim())? {
                    Some(value) => items.push(value),
                    None => bail!("Empty list item for '{}'", property.name()),
                }
            }
            Ok(Some(ObservableList::from_items(items).into()))
        }
        PropertyType::Map(_) => bail!(
            "Map property '{}' cannot be set from the command line",
            property.name()
        ),
        scalar => {
            let item = scalar.item_type();
            Ok(item.parse_text(property.name(), text)?)
        }
    }
}

fn dump(object: &AdaptedObject, adapter: &XmlAdapter, out: &mut impl Write) -> anyhow::Result<()> {
    let meta = object.type_descriptor();
    let metadata = adapter
        .metadata_for(meta.name())
        .with_context(|| format!("Type '{}' is not bound to XML", meta.name()))?;

    for property in meta.properties() {
        let accessor = metadata.accessor(property)?;
        if accessor.kind() == AccessorKind::Ignore {
            continue;
        }
        match object.get_if_exists(property.name())? {
            Some(value) => writeln!(out, "{} = {}", property.name(), value)?,
            None => writeln!(out, "{} = (none)", property.name())?,
        }
    }
    Ok(())
}
