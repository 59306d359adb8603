//! Catálogo de caminos resueltos
//!
//! Guarda un `RoutePath` por `(route_id, path_id)`. Se construye la primera
//! vez que se pide y se sirve desde memoria hasta que se registra una parada
//! de ese camino.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::repositories::StopStore;
use crate::services::route_path_resolver::{resolve_group, resolve_route_paths, PathError, RoutePath};
use crate::utils::errors::{AppError, AppResult};

type PathKey = (i32, i32);

#[derive(Default)]
struct CatalogState {
    paths: HashMap<PathKey, Arc<RoutePath>>,
    /// Sube con cada invalidación; un camino leído antes de la última
    /// invalidación de su clave no se guarda
    generations: HashMap<PathKey, u64>,
}

impl CatalogState {
    fn generation(&self, key: &PathKey) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }

    fn store_if_current(&mut self, key: PathKey, seen: u64, path: &Arc<RoutePath>) -> bool {
        if self.generation(&key) != seen {
            return false;
        }
        self.paths.insert(key, Arc::clone(path));
        true
    }
}

pub struct RoutePathCatalog {
    stops: Arc<dyn StopStore>,
    state: RwLock<CatalogState>,
}

impl RoutePathCatalog {
    pub fn new(stops: Arc<dyn StopStore>) -> Self {
        Self {
            stops,
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// Camino `(route_id, path_id)`; lo resuelve y guarda si aún no está
    pub async fn path(&self, route_id: i32, path_id: i32) -> AppResult<Arc<RoutePath>> {
        let key = (route_id, path_id);
        let seen = {
            let state = self.state.read().await;
            if let Some(path) = state.paths.get(&key) {
                debug!("📦 Camino {}/{} servido desde el catálogo", route_id, path_id);
                return Ok(Arc::clone(path));
            }
            state.generation(&key)
        };

        let stops = self.stops.find_by_route_and_path(route_id, path_id).await?;
        let resolved = Arc::new(resolve_group(&stops, route_id, path_id)?);

        if self.state.write().await.store_if_current(key, seen, &resolved) {
            info!(
                "🗺️ Camino {}/{} resuelto: {} paradas",
                route_id,
                path_id,
                resolved.len()
            );
        } else {
            debug!("⏭️ Camino {}/{} invalidado durante la lectura, no se guarda", route_id, path_id);
        }
        Ok(resolved)
    }

    /// Texto del camino para las proyecciones de pasajeros. Un camino mal
    /// formado no interrumpe la consulta: se registra y se devuelve `None`.
    pub async fn display(&self, route_id: i32, path_id: i32) -> AppResult<Option<String>> {
        match self.path(route_id, path_id).await {
            Ok(path) => Ok(Some(path.display())),
            Err(AppError::MalformedPath(e)) => {
                warn!("⚠️ Camino mal formado, se omite fullRoute: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Todos los caminos de una ruta, cada uno con su propio resultado
    pub async fn route_paths(&self, route_id: i32) -> AppResult<Vec<(i32, Result<Arc<RoutePath>, PathError>)>> {
        let seen: HashMap<PathKey, u64> = self
            .state
            .read()
            .await
            .generations
            .iter()
            .filter(|((route, _), _)| *route == route_id)
            .map(|(key, generation)| (*key, *generation))
            .collect();

        let stops = self.stops.find_by_route(route_id).await?;
        let resolved = resolve_route_paths(&stops, route_id);

        let mut state = self.state.write().await;
        let paths = resolved
            .into_iter()
            .map(|(path_id, result)| {
                let result = result.map(|path| {
                    let key = (route_id, path_id);
                    let path = Arc::new(path);
                    state.store_if_current(key, seen.get(&key).copied().unwrap_or(0), &path);
                    path
                });
                (path_id, result)
            })
            .collect();
        Ok(paths)
    }

    pub async fn invalidate(&self, route_id: i32, path_id: i32) {
        let key = (route_id, path_id);
        let mut state = self.state.write().await;
        *state.generations.entry(key).or_insert(0) += 1;
        if state.paths.remove(&key).is_some() {
            info!("🧹 Camino {}/{} retirado del catálogo", route_id, path_id);
        }
    }

    pub async fn cached_len(&self) -> usize {
        self.state.read().await.paths.len()
    }
}
