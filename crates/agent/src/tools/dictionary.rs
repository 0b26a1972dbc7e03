//! The seven data dictionary tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use ukbsearch_dictionary::DictionaryStore;

use super::{ParamSpec, ToolArgs, ToolDescriptor, ToolRegistry, ToolTrait};
use crate::Result;

type Store = Arc<dyn DictionaryStore>;

pub static EXPLAIN_FIELD: ToolDescriptor = ToolDescriptor {
    name: "explain_field_by_id",
    description: "Get complete field information by field ID, including description, units, participant count and encoding values.",
    params: &[ParamSpec::required_int("field_id", "UK Biobank field ID, e.g. 31")],
};

pub static SEARCH_FIELDS: ToolDescriptor = ToolDescriptor {
    name: "search_fields_by_keyword",
    description: "Search fields by keyword, fuzzy matching titles and descriptions. Single English keywords work best.",
    params: &[
        ParamSpec::required_string("keyword", "Keyword to search for"),
        ParamSpec::int_with_default("limit", 20, "Maximum number of fields"),
    ],
};

pub static CATEGORY_FIELDS: ToolDescriptor = ToolDescriptor {
    name: "get_category_fields",
    description: "Get the fields under a category, for browsing one medical domain.",
    params: &[
        ParamSpec::required_string("category_name", "Category name, partial names accepted"),
        ParamSpec::int_with_default("limit", 50, "Maximum number of fields"),
    ],
};

pub static ENCODING_VALUES: ToolDescriptor = ToolDescriptor {
    name: "get_encoding_values",
    description: "View the meaning of each coded value of an encoding.",
    params: &[
        ParamSpec::required_int("encoding_id", "Encoding ID, e.g. 100291"),
        ParamSpec::int_with_default("limit", 50, "Maximum number of values"),
    ],
};

pub static RECOMMEND_RELATED: ToolDescriptor = ToolDescriptor {
    name: "recommend_related_fields",
    description: "Recommend fields related to a given field to discover related measurements.",
    params: &[
        ParamSpec::required_int("field_id", "Reference field ID"),
        ParamSpec::int_with_default("limit", 10, "Maximum number of recommendations"),
    ],
};

pub static ALL_CATEGORIES: ToolDescriptor = ToolDescriptor {
    name: "get_all_categories",
    description: "List every available data category.",
    params: &[],
};

pub static RECOMMENDED_FIELDS: ToolDescriptor = ToolDescriptor {
    name: "get_recommended_fields",
    description: "List curated, commonly used fields, optionally within one category.",
    params: &[
        ParamSpec::optional_string("category_name", "Optional category filter"),
        ParamSpec::int_with_default("limit", 20, "Maximum number of fields"),
    ],
};

/// Every dictionary tool descriptor, in the order they are offered to the model
pub static DESCRIPTORS: [&ToolDescriptor; 7] = [
    &EXPLAIN_FIELD,
    &SEARCH_FIELDS,
    &CATEGORY_FIELDS,
    &ENCODING_VALUES,
    &RECOMMEND_RELATED,
    &ALL_CATEGORIES,
    &RECOMMENDED_FIELDS,
];

macro_rules! dictionary_tool {
    ($name:ident) => {
        pub struct $name {
            store: Store,
        }

        impl $name {
            pub fn new(store: Store) -> Self {
                Self { store }
            }
        }
    };
}

dictionary_tool!(ExplainFieldTool);
dictionary_tool!(SearchFieldsTool);
dictionary_tool!(CategoryFieldsTool);
dictionary_tool!(EncodingValuesTool);
dictionary_tool!(RecommendRelatedTool);
dictionary_tool!(AllCategoriesTool);
dictionary_tool!(RecommendedFieldsTool);

#[async_trait]
impl ToolTrait for ExplainFieldTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &EXPLAIN_FIELD
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let detail = self.store.explain_field(args.int("field_id")?)?;
        Ok(serde_json::to_value(detail)?)
    }
}

#[async_trait]
impl ToolTrait for SearchFieldsTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &SEARCH_FIELDS
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let keyword = args.string("keyword")?;
        let fields = self.store.search_fields(keyword, args.limit("limit")?)?;
        Ok(json!({
            "keyword": keyword,
            "count": fields.len(),
            "fields": fields,
        }))
    }
}

#[async_trait]
impl ToolTrait for CategoryFieldsTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &CATEGORY_FIELDS
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let fields = self
            .store
            .category_fields(args.string("category_name")?, args.limit("limit")?)?;
        Ok(serde_json::to_value(fields)?)
    }
}

#[async_trait]
impl ToolTrait for EncodingValuesTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &ENCODING_VALUES
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let values = self
            .store
            .encoding_values(args.int("encoding_id")?, args.limit("limit")?)?;
        Ok(serde_json::to_value(values)?)
    }
}

#[async_trait]
impl ToolTrait for RecommendRelatedTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &RECOMMEND_RELATED
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let related = self
            .store
            .related_fields(args.int("field_id")?, args.limit("limit")?)?;
        Ok(serde_json::to_value(related)?)
    }
}

#[async_trait]
impl ToolTrait for AllCategoriesTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &ALL_CATEGORIES
    }

    async fn execute(&self, _args: ToolArgs) -> Result<Value> {
        let categories = self.store.all_categories()?;
        Ok(json!({
            "count": categories.len(),
            "categories": categories,
        }))
    }
}

#[async_trait]
impl ToolTrait for RecommendedFieldsTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &RECOMMENDED_FIELDS
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let category = args.opt_string("category_name");
        let fields = self
            .store
            .recommended_fields(category, args.limit("limit")?)?;
        Ok(json!({
            "category": category,
            "count": fields.len(),
            "fields": fields,
        }))
    }
}

/// Register all seven dictionary tools in [`DESCRIPTORS`] order
pub fn register_dictionary_tools(registry: &mut ToolRegistry, store: Store) {
    registry.register(ExplainFieldTool::new(store.clone()));
    registry.register(SearchFieldsTool::new(store.clone()));
    registry.register(CategoryFieldsTool::new(store.clone()));
    registry.register(EncodingValuesTool::new(store.clone()));
    registry.register(RecommendRelatedTool::new(store.clone()));
    registry.register(AllCategoriesTool::new(store.clone()));
    registry.register(RecommendedFieldsTool::new(store));
}

impl ToolRegistry {
    /// Registry holding the seven dictionary tools
    pub fn with_dictionary(store: Store) -> Self {
        let mut registry = Self::new();
        register_dictionary_tools(&mut registry, store);
        registry
    }
}
