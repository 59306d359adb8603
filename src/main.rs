use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trip_service::config::AppConfig;
use trip_service::database::DatabaseConnection;
use trip_service::listeners::ListenerSet;
use trip_service::messaging::{EventBus, KafkaEventBus};
use trip_service::realtime::RealtimeHub;
use trip_service::repositories::{StopRepository, TripRepository, TripStore};
use trip_service::routes::create_app;
use trip_service::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚌 Trip Service - viajes, asientos y agenda de conductores");
    info!("==========================================================");

    let config = AppConfig::from_env()?;
    if !config.environment.is_development() && config.environment.cors_origins.iter().any(|o| o == "*") {
        warn!("⚠️ CORS abierto a cualquier origen fuera de desarrollo");
    }

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::new(&config.database).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };
    db_connection.run_migrations().await?;
    let pool = db_connection.pool().clone();

    // Inicializar broker
    let bus: Arc<dyn EventBus> = match KafkaEventBus::new(config.kafka.clone()) {
        Ok(bus) => Arc::new(bus),
        Err(e) => {
            error!("❌ Error creando el cliente de Kafka: {}", e);
            return Err(anyhow::anyhow!("Error de Kafka: {}", e));
        }
    };

    let trips: Arc<dyn TripStore> = Arc::new(TripRepository::new(pool.clone()));
    let stops = Arc::new(StopRepository::new(pool));
    let hub = RealtimeHub::new();

    let listeners = ListenerSet::start(Arc::clone(&bus), Arc::clone(&trips), hub.clone(), &config.listeners);

    let app_state = AppState::new(config.environment.clone(), trips, stops, Arc::clone(&bus), hub);
    info!(
        "⚙️ Entorno: {} | política de estados: {:?}",
        config.environment.environment,
        app_state.status_engine.policy()
    );
    let app = create_app(app_state);

    let addr: SocketAddr = config.environment.server_url().parse()?;
    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /api/v1/health - Health check");
    info!("🚌 Viajes:");
    info!("   GET/POST /api/v1/trips - Listar / crear viajes");
    info!("   GET/PUT/DELETE /api/v1/trips/:id - Detalle / reemplazo / eliminación");
    info!("   GET  /api/v1/trips/search - Búsqueda para pasajeros");
    info!("   GET  /api/v1/trips/:id/info - Resumen para pasajeros");
    info!("   GET  /api/v1/trips/status/:status - Viajes por estado");
    info!("   PUT  /api/v1/trips/:id/status - Cambiar estado");
    info!("   GET  /api/v1/trips/driver/:driver_id - Viajes de un conductor");
    info!("   GET  /api/v1/trips/:id/logs - Auditoría");
    info!("🗺️ Rutas:");
    info!("   GET  /api/v1/routes/:route_id/trips - Viajes de la ruta en una fecha");
    info!("   GET/POST /api/v1/routes/:route_id/stops - Paradas");
    info!("   GET  /api/v1/routes/:route_id/paths - Caminos resueltos");
    info!("📡 Tiempo real:");
    info!("   GET  /ws/trip-updates - WebSocket de actualizaciones");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
    }

    // Detener consumidores antes de cerrar el productor
    listeners.stop().await;
    if let Err(e) = bus.shutdown(config.listeners.close_grace).await {
        warn!("⚠️ Error cerrando el cliente de Kafka: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el manejador de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
