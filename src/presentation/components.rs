use crate::application::ChartConfig;
use crate::domain::chart::SurfaceState;
use crate::domain::events::ChartEvent;
use crate::domain::market_data::{ConnectionStatus, Symbol, Timeframe};
use crate::presentation::chart_runtime::ChartRuntime;
use leptos::html::Div;
use leptos::*;
use wasm_bindgen::JsCast;

/// Host component: mounts a live chart into its own container and shows
/// surface and feed status on top of it. `symbol` and `timeframe` may be
/// signals; later values switch the running chart.
#[component]
pub fn LiveChartPanel(
    #[prop(into)] symbol: MaybeSignal<Symbol>,
    #[prop(into)] timeframe: MaybeSignal<Timeframe>,
    #[prop(optional)] config: Option<ChartConfig>,
) -> impl IntoView {
    let container = create_node_ref::<Div>();
    let runtime = store_value::<Option<ChartRuntime>>(None);
    let surface = create_rw_signal(SurfaceState::Uninitialized);
    let connection = create_rw_signal(ConnectionStatus::Disconnected);
    let error = create_rw_signal::<Option<String>>(None);
    let config = config.unwrap_or_default();
    let initial = (symbol.clone(), timeframe.clone());

    create_effect(move |_| {
        let Some(div) = container.get() else {
            return;
        };
        if runtime.with_value(|rt| rt.is_some()) {
            return;
        }
        let element: web_sys::HtmlElement = (*div).clone().unchecked_into();
        let chart =
            ChartRuntime::new(element, config.clone(), initial.0.get_untracked(), initial.1.get_untracked());
        chart.subscribe(move |event| match event {
            ChartEvent::SurfaceStateChanged { to, .. } => surface.set(to.clone()),
            ChartEvent::ConnectionStatusChanged { status, .. } => connection.set(*status),
            ChartEvent::ErrorRaised(err) if err.is_user_visible() => error.set(Some(err.to_string())),
            _ => {}
        });
        chart.start();
        runtime.set_value(Some(chart));
    });

    create_effect(move |_| {
        let timeframe = timeframe.get();
        runtime.with_value(|rt| {
            if let Some(rt) = rt {
                rt.set_timeframe(timeframe);
            }
        });
    });

    create_effect(move |_| {
        let symbol = symbol.get();
        runtime.with_value(|rt| {
            if let Some(rt) = rt {
                rt.switch_symbol(symbol);
            }
        });
    });

    on_cleanup(move || {
        runtime.with_value(|rt| {
            if let Some(rt) = rt {
                rt.dispose();
            }
        });
    });

    let retry = move |_| {
        error.set(None);
        runtime.with_value(|rt| {
            if let Some(rt) = rt {
                rt.retry();
            }
        });
    };

    view! {
        <div class="live-chart-panel" style="position: relative; width: 100%; height: 100%;">
            <div node_ref=container style="position: absolute; inset: 0;"></div>
            <div
                class="live-chart-status"
                style="position: absolute; top: 4px; left: 8px; font: 11px sans-serif; color: #b2b5be; pointer-events: none;"
            >
                {move || status_line(&surface.get(), connection.get())}
            </div>
            <Show when=move || error.get().is_some()>
                <div
                    class="live-chart-error"
                    style="position: absolute; bottom: 8px; left: 8px; padding: 6px 10px; background: #2a1215; color: #ef5350; border-radius: 4px;"
                >
                    {move || error.get().unwrap_or_default()}
                    " "
                    <button on:click=retry>"Retry"</button>
                </div>
            </Show>
        </div>
    }
}

/// One-line status shown over the chart
pub fn status_line(surface: &SurfaceState, connection: ConnectionStatus) -> String {
    match surface {
        SurfaceState::Uninitialized | SurfaceState::ContainerPending => "waiting for layout".to_string(),
        SurfaceState::Initializing => "starting chart".to_string(),
        SurfaceState::Error(_) => "chart unavailable".to_string(),
        SurfaceState::Disposed => "closed".to_string(),
        SurfaceState::Ready | SurfaceState::Updating | SurfaceState::Resizing => match connection {
            ConnectionStatus::Connected => "live".to_string(),
            ConnectionStatus::Connecting => "connecting".to_string(),
            ConnectionStatus::Disconnected => "offline, reconnecting".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_prefers_surface_problems() {
        assert_eq!(status_line(&SurfaceState::Error("x".into()), ConnectionStatus::Connected), "chart unavailable");
        assert_eq!(status_line(&SurfaceState::Ready, ConnectionStatus::Connected), "live");
        assert_eq!(status_line(&SurfaceState::Resizing, ConnectionStatus::Disconnected), "offline, reconnecting");
    }
}
