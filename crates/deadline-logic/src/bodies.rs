//! Body catalog: the star → planets → moons tree supplied by the host.
//!
//! The catalog is validated once on construction: exactly one star, exactly
//! one home world, every parent resolves, and no body is its own ancestor.
//! After that, lookups can rely on the tree being well formed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{DeadlineError, Result};
use crate::orbit::DEFAULT_STAR_GRAV_PARAM;

/// A gravitating body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub name: String,
    /// Body this one orbits; absent for the star.
    #[serde(default)]
    pub parent: Option<String>,
    /// Orbital period in seconds.
    #[serde(default)]
    pub period: f64,
    /// Orbit radius (semi-major axis) in metres.
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub home: bool,
    /// Gravitational parameter in m³/s². Only the star's value is used.
    #[serde(default = "default_grav_param")]
    pub grav_param: f64,
}

fn default_grav_param() -> f64 {
    DEFAULT_STAR_GRAV_PARAM
}

impl Body {
    pub fn new(name: &str, parent: Option<&str>, period: f64, radius: f64) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            period,
            radius,
            home: false,
            grav_param: DEFAULT_STAR_GRAV_PARAM,
        }
    }

    pub fn star(name: &str) -> Self {
        Self::new(name, None, 0.0, 0.0)
    }

    pub fn with_home(mut self) -> Self {
        self.home = true;
        self
    }

    pub fn with_grav_param(mut self, grav_param: f64) -> Self {
        self.grav_param = grav_param;
        self
    }

    fn is_root(&self) -> bool {
        match &self.parent {
            None => true,
            Some(p) => p == &self.name,
        }
    }
}

/// Validated, name-indexed collection of bodies.
#[derive(Debug, Clone)]
pub struct BodyCatalog {
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
    star: usize,
    home: usize,
}

impl BodyCatalog {
    pub fn new(bodies: Vec<Body>) -> Result<Self> {
        let mut index = HashMap::with_capacity(bodies.len());
        for (i, body) in bodies.iter().enumerate() {
            if index.insert(body.name.clone(), i).is_some() {
                return Err(DeadlineError::InvalidCatalog(format!(
                    "duplicate body '{}'",
                    body.name
                )));
            }
        }

        let roots: Vec<usize> = (0..bodies.len()).filter(|&i| bodies[i].is_root()).collect();
        let star = match roots.as_slice() {
            [only] => *only,
            [] => return Err(DeadlineError::InvalidCatalog("no star (body without parent)".into())),
            _ => {
                let names: Vec<&str> = roots.iter().map(|&i| bodies[i].name.as_str()).collect();
                return Err(DeadlineError::InvalidCatalog(format!(
                    "more than one star: {}",
                    names.join(", ")
                )));
            }
        };

        let homes: Vec<usize> = (0..bodies.len()).filter(|&i| bodies[i].home).collect();
        let home = match homes.as_slice() {
            [only] => *only,
            [] => return Err(DeadlineError::InvalidCatalog("no home world".into())),
            _ => {
                return Err(DeadlineError::InvalidCatalog(
                    "more than one home world".into(),
                ))
            }
        };
        if home == star {
            return Err(DeadlineError::InvalidCatalog(
                "the star cannot be the home world".into(),
            ));
        }

        for body in &bodies {
            if let Some(parent) = &body.parent {
                if !index.contains_key(parent) {
                    return Err(DeadlineError::InvalidCatalog(format!(
                        "'{}' orbits unknown body '{}'",
                        body.name, parent
                    )));
                }
            }
        }

        let catalog = Self {
            bodies,
            index,
            star,
            home,
        };

        // Every chain must reach the star within `len` steps.
        for body in &catalog.bodies {
            let mut current = body;
            let mut steps = 0;
            while !current.is_root() {
                steps += 1;
                if steps > catalog.bodies.len() {
                    return Err(DeadlineError::InvalidCatalog(format!(
                        "orbit cycle through '{}'",
                        body.name
                    )));
                }
                current = match catalog.parent_of(current) {
                    Some(p) => p,
                    None => break,
                };
            }
        }

        Ok(catalog)
    }

    /// Parse a JSON array of bodies.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let bodies: Vec<Body> = serde_json::from_str(json)?;
        Self::new(bodies)
    }

    pub fn get(&self, name: &str) -> Option<&Body> {
        self.index.get(name).map(|&i| &self.bodies[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn star(&self) -> &Body {
        &self.bodies[self.star]
    }

    pub fn home(&self) -> &Body {
        &self.bodies[self.home]
    }

    /// The planet the home world belongs to (the home world itself when it
    /// orbits the star directly).
    pub fn home_planet(&self) -> &Body {
        self.planet_of(self.home()).unwrap_or_else(|| self.home())
    }

    pub fn is_star(&self, body: &Body) -> bool {
        body.name == self.star().name
    }

    pub fn parent_of(&self, body: &Body) -> Option<&Body> {
        if body.is_root() {
            return None;
        }
        body.parent.as_deref().and_then(|p| self.get(p))
    }

    /// Whether `body` orbits the star directly.
    pub fn is_planet(&self, body: &Body) -> bool {
        self.parent_of(body).is_some_and(|p| self.is_star(p))
    }

    /// Nearest ancestor (or `body` itself) that orbits the star directly.
    /// `None` for the star.
    pub fn planet_of<'a>(&'a self, body: &'a Body) -> Option<&'a Body> {
        let mut current = body;
        for _ in 0..=self.bodies.len() {
            if self.is_star(current) {
                return None;
            }
            if self.is_planet(current) {
                return Some(current);
            }
            current = self.parent_of(current)?;
        }
        None
    }
}
