//! Recipe defaults
//!
//! A recipe is a named preset (e.g. `drupal11`) that contributes default
//! services and tooling. The table is plain data: adding a recipe means adding
//! a row, not a type.

use crate::{
    parser::Definition,
    types::{AppDescriptor, ServiceDescriptor, ToolingCommand, ToolingEntry},
};
use indexmap::IndexMap;
use tracing::debug;

pub const DOCS_ROOT: &str = "https://docs.lando.dev";

/// A default tooling entry contributed by a recipe
#[derive(Debug)]
pub struct ToolDefault {
    pub name: &'static str,
    pub service: &'static str,
    pub description: &'static str,
    pub command: &'static str,
}

/// One family of recipes sharing the same defaults
#[derive(Debug)]
pub struct RecipeFamily {
    /// Documentation slug under `docs.lando.dev/plugins/`
    pub family: &'static str,
    /// Recipe name and the php version its appserver defaults to
    pub recipes: &'static [(&'static str, &'static str)],
    pub database: &'static str,
    pub tooling: &'static [ToolDefault],
}

const PHP: ToolDefault = ToolDefault {
    name: "php",
    service: "appserver",
    description: "Runs php commands",
    command: "php",
};

const COMPOSER: ToolDefault = ToolDefault {
    name: "composer",
    service: "appserver",
    description: "Runs composer commands",
    command: "composer",
};

const MYSQL: ToolDefault = ToolDefault {
    name: "mysql",
    service: "database",
    description: "Drops into a MySQL shell on a database service",
    command: "mysql -uroot",
};

const DRUSH: ToolDefault = ToolDefault {
    name: "drush",
    service: "appserver",
    description: "Runs drush commands",
    command: "drush",
};

static RECIPES: &[RecipeFamily] = &[
    RecipeFamily {
        family: "drupal",
        recipes: &[
            ("drupal6", "5.6"),
            ("drupal7", "7.4"),
            ("drupal8", "7.4"),
            ("drupal9", "8.1"),
            ("drupal10", "8.3"),
            ("drupal11", "8.3"),
        ],
        database: "mysql:8.0",
        tooling: &[PHP, COMPOSER, DRUSH, MYSQL],
    },
    RecipeFamily {
        family: "backdrop",
        recipes: &[("backdrop", "8.2")],
        database: "mysql:8.0",
        tooling: &[
            PHP,
            COMPOSER,
            ToolDefault {
                name: "bee",
                service: "appserver",
                description: "Runs bee commands",
                command: "bee",
            },
            MYSQL,
        ],
    },
    RecipeFamily {
        family: "wordpress",
        recipes: &[("wordpress", "8.2")],
        database: "mysql:8.0",
        tooling: &[
            PHP,
            COMPOSER,
            ToolDefault {
                name: "wp",
                service: "appserver",
                description: "Runs wp-cli commands",
                command: "wp",
            },
            MYSQL,
        ],
    },
    RecipeFamily {
        family: "laravel",
        recipes: &[("laravel", "8.3")],
        database: "mysql:8.0",
        tooling: &[
            PHP,
            COMPOSER,
            ToolDefault {
                name: "artisan",
                service: "appserver",
                description: "Runs artisan commands",
                command: "php /app/artisan",
            },
            MYSQL,
        ],
    },
    RecipeFamily {
        family: "symfony",
        recipes: &[("symfony", "8.3")],
        database: "mysql:8.0",
        tooling: &[
            PHP,
            COMPOSER,
            ToolDefault {
                name: "console",
                service: "appserver",
                description: "Runs Symfony console commands",
                command: "php bin/console",
            },
            MYSQL,
        ],
    },
    RecipeFamily {
        family: "joomla",
        recipes: &[("joomla", "8.1")],
        database: "mysql:8.0",
        tooling: &[PHP, COMPOSER, MYSQL],
    },
    RecipeFamily {
        family: "magento2",
        recipes: &[("magento2", "8.2")],
        database: "mysql:8.0",
        tooling: &[
            PHP,
            COMPOSER,
            ToolDefault {
                name: "magento",
                service: "appserver",
                description: "Runs magento commands",
                command: "php bin/magento",
            },
            MYSQL,
        ],
    },
    RecipeFamily {
        family: "lamp",
        recipes: &[("lamp", "8.3")],
        database: "mysql:8.0",
        tooling: &[PHP, COMPOSER, MYSQL],
    },
    RecipeFamily {
        family: "lemp",
        recipes: &[("lemp", "8.3")],
        database: "mysql:8.0",
        tooling: &[PHP, COMPOSER, MYSQL],
    },
    RecipeFamily {
        family: "pantheon",
        recipes: &[("pantheon", "8.2")],
        database: "mariadb:10.6",
        tooling: &[
            PHP,
            COMPOSER,
            DRUSH,
            ToolDefault {
                name: "terminus",
                service: "appserver",
                description: "Runs terminus commands",
                command: "terminus",
            },
            MYSQL,
        ],
    },
];

/// Find the family and appserver php version for a recipe name
pub fn lookup(recipe: &str) -> Option<(&'static RecipeFamily, &'static str)> {
    let wanted = recipe.trim().to_lowercase();
    RECIPES.iter().find_map(|family| {
        family
            .recipes
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, php)| (family, *php))
    })
}

/// Names of every recipe with defaults
pub fn known_recipes() -> Vec<&'static str> {
    RECIPES
        .iter()
        .flat_map(|family| family.recipes.iter().map(|(name, _)| *name))
        .collect()
}

/// Default tooling for a recipe, in table order; empty for unknown recipes.
pub fn resolve_default_tooling(recipe: &str) -> Vec<ToolingEntry> {
    let Some((family, _)) = lookup(recipe) else {
        return Vec::new();
    };
    family
        .tooling
        .iter()
        .map(|tool| {
            ToolingEntry::new(tool.name, ToolingCommand::from(tool.command))
                .with_service(tool.service)
                .with_description(tool.description)
        })
        .collect()
}

/// Default services for a recipe; empty for unknown recipes.
pub fn resolve_default_services(recipe: &str) -> IndexMap<String, ServiceDescriptor> {
    let mut services = IndexMap::new();
    if let Some((family, php)) = lookup(recipe) {
        services.insert("appserver".to_string(), ServiceDescriptor::new("php", Some(php)));
        services.insert(
            "database".to_string(),
            ServiceDescriptor::from_type_string(family.database),
        );
    }
    services
}

/// Layer user tooling on top of defaults.
///
/// A user entry replaces the default of the same name entirely and keeps its
/// position; new user entries follow the defaults. Disabled names are dropped.
pub fn merge_tooling(
    defaults: Vec<ToolingEntry>,
    user: Vec<ToolingEntry>,
    disabled: &[String],
) -> Vec<ToolingEntry> {
    let mut merged = defaults;
    for entry in user {
        match merged.iter_mut().find(|existing| existing.name == entry.name) {
            Some(existing) => *existing = entry,
            None => merged.push(entry),
        }
    }
    merged.retain(|entry| !disabled.contains(&entry.name));
    merged
}

/// Build the final descriptor for a parsed definition.
pub fn apply_recipe_defaults(definition: Definition) -> AppDescriptor {
    let Definition {
        mut descriptor,
        untyped_services,
        disabled_tooling,
    } = definition;

    let Some(recipe) = descriptor.recipe.clone() else {
        descriptor.tooling = merge_tooling(Vec::new(), descriptor.tooling, &disabled_tooling);
        return descriptor;
    };
    if lookup(&recipe).is_none() {
        debug!("No defaults for recipe '{}'", recipe);
    }

    // declared services keep their order; undeclared defaults follow
    let mut defaults = resolve_default_services(&recipe);
    let mut services = std::mem::take(&mut descriptor.services);
    for (name, declared) in services.iter_mut() {
        match defaults.shift_remove(name) {
            Some(default) if untyped_services.contains(name) => *declared = default,
            _ => {}
        }
    }
    services.extend(defaults);
    descriptor.services = services;

    descriptor.tooling = merge_tooling(
        resolve_default_tooling(&recipe),
        std::mem::take(&mut descriptor.tooling),
        &disabled_tooling,
    );
    descriptor
}

/// Documentation page for a recipe, or the Lando docs root.
pub fn documentation_url(recipe: Option<&str>) -> String {
    match recipe.and_then(lookup) {
        Some((family, _)) => format!("{DOCS_ROOT}/plugins/{}/", family.family),
        None => format!("{DOCS_ROOT}/"),
    }
}
