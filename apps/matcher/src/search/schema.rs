//! Declarative definitions of the four search resources: chunk index, blob
//! data source, chunking + embedding skillset, and indexer.
//!
//! Each CV blob is extracted, split into overlapping pages, embedded page by
//! page, and projected into the index as one record per chunk. The parent
//! document is indexed too. The blob's file name is carried onto every chunk
//! as `candidate_id`.

use serde::Serialize;

use crate::config::SearchConfig;

pub const VECTOR_PROFILE: &str = "vs-default";
pub const HNSW_ALGORITHM: &str = "hnsw-cosine";
pub const CHUNK_MAX_CHARS: u32 = 1400;
pub const CHUNK_OVERLAP_CHARS: u32 = 350;
pub const INDEXER_INTERVAL: &str = "P1D";

/// The kinds of resource the provisioner manages, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Index,
    DataSource,
    Skillset,
    Indexer,
}

impl ResourceKind {
    /// REST collection segment for this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Index => "indexes",
            ResourceKind::DataSource => "datasources",
            ResourceKind::Skillset => "skillsets",
            ResourceKind::Indexer => "indexers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Index => "index",
            ResourceKind::DataSource => "data source",
            ResourceKind::Skillset => "skillset",
            ResourceKind::Indexer => "indexer",
        }
    }
}

/// Any one of the managed resources, ready to be sent as a request body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchResource {
    Index(SearchIndex),
    DataSource(DataSource),
    Skillset(Skillset),
    Indexer(Indexer),
}

impl SearchResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            SearchResource::Index(_) => ResourceKind::Index,
            SearchResource::DataSource(_) => ResourceKind::DataSource,
            SearchResource::Skillset(_) => ResourceKind::Skillset,
            SearchResource::Indexer(_) => ResourceKind::Indexer,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SearchResource::Index(r) => &r.name,
            SearchResource::DataSource(r) => &r.name,
            SearchResource::Skillset(r) => &r.name,
            SearchResource::Indexer(r) => &r.name,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Index
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndex {
    pub name: String,
    pub fields: Vec<SearchField>,
    pub vector_search: VectorSearch,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub key: bool,
    pub searchable: bool,
    pub filterable: bool,
    pub sortable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VectorSearch {
    pub algorithms: Vec<VectorAlgorithm>,
    pub profiles: Vec<VectorProfile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorAlgorithm {
    pub name: String,
    pub kind: String,
    pub hnsw_parameters: HnswParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswParameters {
    pub metric: String,
    pub m: u32,
    pub ef_construction: u32,
    pub ef_search: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VectorProfile {
    pub name: String,
    pub algorithm: String,
}

fn string_field(name: &str) -> SearchField {
    SearchField {
        name: name.to_string(),
        field_type: "Edm.String".to_string(),
        ..Default::default()
    }
}

/// One record per CV chunk, plus the parent CV record.
pub fn chunk_index(config: &SearchConfig) -> SearchIndex {
    let fields = vec![
        SearchField {
            key: true,
            searchable: true,
            filterable: true,
            analyzer: Some("keyword".to_string()),
            ..string_field("id")
        },
        SearchField {
            filterable: true,
            ..string_field("document_id")
        },
        SearchField {
            filterable: true,
            sortable: true,
            ..string_field("candidate_id")
        },
        SearchField {
            searchable: true,
            analyzer: Some("en.lucene".to_string()),
            ..string_field("text")
        },
        SearchField {
            name: "embedding".to_string(),
            field_type: "Collection(Edm.Single)".to_string(),
            searchable: true,
            dimensions: Some(config.embedding.dimensions),
            vector_search_profile: Some(VECTOR_PROFILE.to_string()),
            ..Default::default()
        },
    ];

    SearchIndex {
        name: config.index_name.clone(),
        fields,
        vector_search: VectorSearch {
            algorithms: vec![VectorAlgorithm {
                name: HNSW_ALGORITHM.to_string(),
                kind: "hnsw".to_string(),
                hnsw_parameters: HnswParameters {
                    metric: "cosine".to_string(),
                    m: 16,
                    ef_construction: 400,
                    ef_search: 100,
                },
            }],
            profiles: vec![VectorProfile {
                name: VECTOR_PROFILE.to_string(),
                algorithm: HNSW_ALGORITHM.to_string(),
            }],
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data source
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DataSource {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub description: String,
    pub credentials: DataSourceCredentials,
    pub container: DataContainer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceCredentials {
    pub connection_string: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataContainer {
    pub name: String,
}

pub fn blob_data_source(config: &SearchConfig) -> DataSource {
    DataSource {
        name: config.data_source_name.clone(),
        source_type: "azureblob".to_string(),
        description: "CV PDF/DOCX stored in Azure Blob Storage".to_string(),
        credentials: DataSourceCredentials {
            connection_string: config.storage.connection_string.clone(),
        },
        container: DataContainer {
            name: config.storage.container.clone(),
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Skillset
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skillset {
    pub name: String,
    pub description: String,
    pub skills: Vec<Skill>,
    pub index_projections: IndexProjections,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldMapping {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMapping {
    pub name: String,
    pub target_name: String,
}

fn input(name: &str, source: &str) -> FieldMapping {
    FieldMapping {
        name: name.to_string(),
        source: source.to_string(),
    }
}

fn output(name: &str, target_name: &str) -> OutputMapping {
    OutputMapping {
        name: name.to_string(),
        target_name: target_name.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "@odata.type")]
pub enum Skill {
    #[serde(
        rename = "#Microsoft.Skills.Util.DocumentExtractionSkill",
        rename_all = "camelCase"
    )]
    DocumentExtraction {
        name: String,
        context: String,
        parsing_mode: String,
        data_to_extract: String,
        inputs: Vec<FieldMapping>,
        outputs: Vec<OutputMapping>,
    },

    #[serde(rename = "#Microsoft.Skills.Text.SplitSkill", rename_all = "camelCase")]
    Split {
        name: String,
        context: String,
        default_language_code: String,
        text_split_mode: String,
        maximum_page_length: u32,
        page_overlap_length: u32,
        inputs: Vec<FieldMapping>,
        outputs: Vec<OutputMapping>,
    },

    #[serde(
        rename = "#Microsoft.Skills.Text.AzureOpenAIEmbeddingSkill",
        rename_all = "camelCase"
    )]
    AzureOpenAiEmbedding {
        name: String,
        context: String,
        resource_uri: String,
        api_key: String,
        deployment_id: String,
        model_name: String,
        dimensions: u32,
        inputs: Vec<FieldMapping>,
        outputs: Vec<OutputMapping>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexProjections {
    pub selectors: Vec<ProjectionSelector>,
    pub parameters: ProjectionParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSelector {
    pub target_index_name: String,
    pub parent_key_field_name: String,
    pub source_context: String,
    pub mappings: Vec<FieldMapping>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionParameters {
    pub projection_mode: String,
}

/// Extract → split into pages → embed each page → project pages as chunk records.
pub fn cv_skillset(config: &SearchConfig) -> Skillset {
    let embedding = &config.embedding;

    let skills = vec![
        Skill::DocumentExtraction {
            name: "#1".to_string(),
            context: "/document".to_string(),
            parsing_mode: "default".to_string(),
            data_to_extract: "contentAndMetadata".to_string(),
            inputs: vec![input("file_data", "/document/file_data")],
            outputs: vec![output("content", "extractedContent")],
        },
        Skill::Split {
            name: "#2".to_string(),
            context: "/document".to_string(),
            default_language_code: "en".to_string(),
            text_split_mode: "pages".to_string(),
            maximum_page_length: CHUNK_MAX_CHARS,
            page_overlap_length: CHUNK_OVERLAP_CHARS,
            inputs: vec![input("text", "/document/extractedContent")],
            outputs: vec![output("textItems", "pages")],
        },
        Skill::AzureOpenAiEmbedding {
            name: "#3".to_string(),
            context: "/document/pages/*".to_string(),
            resource_uri: embedding.endpoint.clone(),
            api_key: embedding.api_key.clone(),
            deployment_id: embedding.deployment.clone(),
            model_name: embedding.deployment.clone(),
            dimensions: embedding.dimensions,
            inputs: vec![input("text", "/document/pages/*")],
            outputs: vec![output("embedding", "embedding")],
        },
    ];

    let index_projections = IndexProjections {
        selectors: vec![ProjectionSelector {
            target_index_name: config.index_name.clone(),
            parent_key_field_name: "document_id".to_string(),
            source_context: "/document/pages/*".to_string(),
            mappings: vec![
                input("text", "/document/pages/*"),
                input("embedding", "/document/pages/*/embedding"),
                input("candidate_id", "/document/metadata_storage_name"),
            ],
        }],
        parameters: ProjectionParameters {
            projection_mode: "includeIndexingParentDocuments".to_string(),
        },
    };

    Skillset {
        name: config.skillset_name.clone(),
        description: "Split CVs into overlapping pages and embed each page".to_string(),
        skills,
        index_projections,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Indexer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Indexer {
    pub name: String,
    pub data_source_name: String,
    pub target_index_name: String,
    pub skillset_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<IndexingSchedule>,
    pub field_mappings: Vec<IndexerFieldMapping>,
    pub parameters: IndexerParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexingSchedule {
    pub interval: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerFieldMapping {
    pub source_field_name: String,
    pub target_field_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_function: Option<MappingFunction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingFunction {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexerParameters {
    pub configuration: IndexerConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerConfiguration {
    pub data_to_extract: String,
    pub allow_skillset_to_read_file_data: bool,
}

/// Runs daily. Parent CV records are keyed by their encoded storage path.
pub fn cv_indexer(config: &SearchConfig) -> Indexer {
    Indexer {
        name: config.indexer_name.clone(),
        data_source_name: config.data_source_name.clone(),
        target_index_name: config.index_name.clone(),
        skillset_name: config.skillset_name.clone(),
        schedule: Some(IndexingSchedule {
            interval: INDEXER_INTERVAL.to_string(),
        }),
        field_mappings: vec![
            IndexerFieldMapping {
                source_field_name: "metadata_storage_path".to_string(),
                target_field_name: "id".to_string(),
                mapping_function: Some(MappingFunction {
                    name: "base64Encode".to_string(),
                }),
            },
            IndexerFieldMapping {
                source_field_name: "metadata_storage_name".to_string(),
                target_field_name: "candidate_id".to_string(),
                mapping_function: None,
            },
        ],
        parameters: IndexerParameters {
            configuration: IndexerConfiguration {
                data_to_extract: "contentAndMetadata".to_string(),
                allow_skillset_to_read_file_data: true,
            },
        },
    }
}

/// All four resources in the order they must be created.
pub fn cv_search_resources(config: &SearchConfig) -> Vec<SearchResource> {
    vec![
        SearchResource::Index(chunk_index(config)),
        SearchResource::DataSource(blob_data_source(config)),
        SearchResource::Skillset(cv_skillset(config)),
        SearchResource::Indexer(cv_indexer(config)),
    ]
}
