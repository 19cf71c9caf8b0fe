//! Dataset record -> DCAT graph.

use oxrdf::vocab::{rdf, xsd};
use oxrdf::{Graph, NamedNode};

use crate::config::ThemeMode;
use crate::emitter::{turtle, GraphBuilder};
use crate::error::{ProjectionError, ValueError};
use crate::model::iri::{check_http_iri, mailto_iri, IriMinter};
use crate::model::record::{present, DatasetRecord, Timestamp};
use crate::model::vocab::{dcat, dct, foaf, vcard};

use super::{ProjectedDataset, ProjectionOptions};

/// Media type emitted when a record does not name one.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

pub const ACCESS_PUBLIC: &str = "public";
pub const ACCESS_RESTRICTED: &str = "restricted";

/// Theme value after validation.
enum Theme<'r> {
    Literal(&'r str),
    Iri(NamedNode),
}

/// Every checked value the projection needs, gathered before any triple
/// is emitted so a bad record never yields a partial graph.
struct CheckedRecord<'r> {
    dataset: NamedNode,
    title: &'r str,
    publisher: &'r str,
    contact_point: &'r str,
    issued: String,
    modified: String,
    access_url: Option<NamedNode>,
    semantic_model: Option<NamedNode>,
    webid: Option<NamedNode>,
    theme: Option<Theme<'r>>,
}

/// Maps dataset records to self-contained DCAT documents.
#[derive(Debug, Clone)]
pub struct DatasetProjector {
    iris: IriMinter,
    theme_mode: ThemeMode,
    contact_nodes: bool,
    require_access_url: bool,
}

impl DatasetProjector {
    pub fn new(options: &ProjectionOptions) -> Self {
        Self {
            iris: IriMinter::new(&options.base_uri),
            theme_mode: options.theme_mode,
            contact_nodes: options.contact_nodes,
            require_access_url: true,
        }
    }

    /// Accept records without an access URL and leave out their
    /// distribution. Used when rebuilding from rows that predate the
    /// required field.
    pub fn allow_missing_access_url(mut self) -> Self {
        self.require_access_url = false;
        self
    }

    pub fn iris(&self) -> &IriMinter {
        &self.iris
    }

    /// Project a record and serialize it as Turtle.
    pub fn project(&self, record: &DatasetRecord) -> Result<ProjectedDataset, ProjectionError> {
        let graph = self.build_graph(record)?;
        let turtle = turtle::serialize_graph(&graph)?;
        Ok(ProjectedDataset {
            identifier: record.identifier.clone(),
            dataset_iri: self.iris.dataset_iri(&record.identifier),
            turtle,
            triple_count: graph.len(),
        })
    }

    /// Build the dataset's graph without serializing it.
    pub fn build_graph(&self, record: &DatasetRecord) -> Result<Graph, ValueError> {
        let checked = self.check(record)?;
        let mut builder = GraphBuilder::new();
        self.emit_dataset(&mut builder, record, &checked);
        Ok(builder.into_graph())
    }

    fn check<'r>(&self, record: &'r DatasetRecord) -> Result<CheckedRecord<'r>, ValueError> {
        let dataset = self.iris.dataset_node(&record.identifier)?;
        let title = required("title", &record.title)?;
        let publisher = required("publisher", &record.publisher)?;
        let contact_point = required("contact_point", &record.contact_point)?;
        let issued = timestamp("issued", record.issued.as_ref())?;
        let modified = timestamp("modified", record.modified.as_ref())?;

        let access_url = match record.access_url_dataset.trim() {
            "" if self.require_access_url => {
                return Err(ValueError::MissingField {
                    field: "access_url_dataset",
                });
            }
            "" => None,
            url => Some(check_http_iri("access_url_dataset", url)?),
        };
        let semantic_model = present(&record.access_url_semantic_model)
            .map(|url| check_http_iri("access_url_semantic_model", url))
            .transpose()?;
        let webid = present(&record.webid)
            .map(|url| check_http_iri("webid", url))
            .transpose()?;
        let theme = match (present(&record.theme), self.theme_mode) {
            (None, _) => None,
            (Some(text), ThemeMode::Literal) => Some(Theme::Literal(text)),
            (Some(iri), ThemeMode::Iri) => Some(Theme::Iri(check_http_iri("theme", iri)?)),
        };

        Ok(CheckedRecord {
            dataset,
            title,
            publisher,
            contact_point,
            issued,
            modified,
            access_url,
            semantic_model,
            webid,
            theme,
        })
    }

    fn emit_dataset(
        &self,
        builder: &mut GraphBuilder,
        record: &DatasetRecord,
        checked: &CheckedRecord<'_>,
    ) {
        let dataset = checked.dataset.as_ref();
        let distribution = NamedNode::new_unchecked(self.iris.distribution_iri(dataset.as_str()));
        let publisher = NamedNode::new_unchecked(self.iris.publisher_iri(dataset.as_str()));

        builder.emit_iri(dataset, rdf::TYPE, dcat::DATASET);
        builder.emit_literal(dataset, dct::IDENTIFIER, record.identifier.trim());
        builder.emit_literal(dataset, dct::TITLE, checked.title);
        if let Some(description) = present(&record.description) {
            builder.emit_literal(dataset, dct::DESCRIPTION, description);
        }
        builder.emit_typed_literal(dataset, dct::ISSUED, &checked.issued, xsd::DATE_TIME);
        builder.emit_typed_literal(dataset, dct::MODIFIED, &checked.modified, xsd::DATE_TIME);
        let access = if record.is_public {
            ACCESS_PUBLIC
        } else {
            ACCESS_RESTRICTED
        };
        builder.emit_literal(dataset, dct::ACCESS_RIGHTS, access);

        match &checked.theme {
            Some(Theme::Literal(text)) => builder.emit_literal(dataset, dcat::THEME, text),
            Some(Theme::Iri(iri)) => builder.emit_iri(dataset, dcat::THEME, iri.as_ref()),
            None => {}
        }
        if let Some(model) = &checked.semantic_model {
            builder.emit_iri(dataset, dct::CONFORMS_TO, model.as_ref());
        }
        if let Some(webid) = &checked.webid {
            builder.emit_iri(dataset, foaf::IS_PRIMARY_TOPIC_OF, webid.as_ref());
        }

        if let Some(access_url) = &checked.access_url {
            builder.emit_iri(dataset, dcat::DISTRIBUTION_PROP, distribution.as_ref());
            builder.emit_iri(distribution.as_ref(), rdf::TYPE, dcat::DISTRIBUTION);
            builder.emit_iri(distribution.as_ref(), dcat::ACCESS_URL, access_url.as_ref());
            builder.emit_iri(distribution.as_ref(), dcat::DOWNLOAD_URL, access_url.as_ref());
            let media_type = present(&record.file_format).unwrap_or(DEFAULT_MEDIA_TYPE);
            builder.emit_literal(distribution.as_ref(), dcat::MEDIA_TYPE, media_type);
        }

        // Publisher
        builder.emit_iri(dataset, dct::PUBLISHER, publisher.as_ref());
        builder.emit_iri(publisher.as_ref(), rdf::TYPE, foaf::AGENT);
        builder.emit_literal(publisher.as_ref(), foaf::NAME, checked.publisher);

        if self.contact_nodes {
            let contact = NamedNode::new_unchecked(self.iris.contact_iri(dataset.as_str()));
            builder.emit_iri(dataset, dcat::CONTACT_POINT, contact.as_ref());
            builder.emit_iri(contact.as_ref(), rdf::TYPE, vcard::KIND);
            builder.emit_literal(contact.as_ref(), vcard::FN, checked.contact_point);
            if let Some(email) = mailto_iri(checked.contact_point) {
                builder.emit_iri(contact.as_ref(), vcard::HAS_EMAIL, email.as_ref());
            }
        }
    }
}

fn required<'r>(field: &'static str, value: &'r str) -> Result<&'r str, ValueError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValueError::MissingField { field })
    } else {
        Ok(value)
    }
}

fn timestamp(field: &'static str, value: Option<&Timestamp>) -> Result<String, ValueError> {
    let lexical = value
        .map(Timestamp::lexical)
        .ok_or(ValueError::MissingField { field })?;
    required(field, &lexical)?;
    Ok(lexical)
}
