#[cfg(test)]
mod sim_tests {
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use crate::core::alerts::model::{AlertError, AlertPhase, AlertRequest, UnlockState};
    use crate::core::alerts::native::PlatformBridge;
    use crate::core::alerts::service::{spawn_alert_service, AlarmPlayer, ServiceBridge};
    use crate::core::alerts::web::testing::FakeAudioElement;
    use crate::core::config::Settings;
    use crate::core::provider::{AlertProvider, OrderAction, PushOutcome};
    use crate::core::push::PushEvent;

    /// Stands in for the speaker; records what the service asked of it.
    #[derive(Clone, Default)]
    struct Speaker {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Speaker {
        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl AlarmPlayer for Speaker {
        fn begin(&mut self, request: &AlertRequest) -> Result<(), AlertError> {
            self.log.lock().unwrap().push(format!("begin {}", request.order_id));
            Ok(())
        }

        fn end(&mut self) {
            self.log.lock().unwrap().push("end".to_string());
        }
    }

    fn native_setup() -> (Speaker, ServiceBridge, AlertProvider) {
        let speaker = Speaker::default();
        let player = speaker.clone();
        let bridge = spawn_alert_service(move || player).unwrap();
        let provider = AlertProvider::from_settings(
            &Settings::default(),
            &|| true,
            Some(Rc::new(bridge.clone()) as Rc<dyn PlatformBridge>),
            None,
        );
        (speaker, bridge, provider)
    }

    #[tokio::test]
    async fn simulate_single_order_accepted() {
        let (speaker, bridge, provider) = native_setup();
        let controller = provider.controller().clone();

        let outcome = provider
            .handle_push(&PushEvent::new_order("ORD-1", "New Order!", "Order #1042 is waiting"))
            .await;
        assert_eq!(outcome, PushOutcome::AlertStarted);
        assert!(controller.is_playing().await);
        assert_eq!(controller.phase(), AlertPhase::Active);

        provider.order_acted("ORD-1", OrderAction::Accepted).await;
        assert!(!controller.is_playing().await);
        assert_eq!(controller.active_count(), 0);
        assert_eq!(speaker.entries(), vec!["begin ORD-1", "end"]);

        bridge.shutdown();
    }

    #[tokio::test]
    async fn simulate_two_orders_back_to_back() {
        let (speaker, bridge, provider) = native_setup();
        let controller = provider.controller().clone();

        provider.handle_push(&PushEvent::new_order("ORD-1", "New Order!", "")).await;
        provider.handle_push(&PushEvent::new_order("ORD-2", "New Order!", "")).await;
        assert_eq!(speaker.entries(), vec!["begin ORD-1"]);

        controller.stop(Some("ORD-1"), false).await;
        assert!(controller.is_playing().await);
        assert_eq!(controller.active_orders(), vec!["ORD-2"]);

        controller.stop(Some("ORD-2"), false).await;
        assert!(!controller.is_playing().await);
        assert_eq!(speaker.entries(), vec!["begin ORD-1", "end"]);

        bridge.shutdown();
    }

    #[tokio::test]
    async fn simulate_logout_with_orders_waiting() {
        let (speaker, bridge, provider) = native_setup();
        for id in ["ORD-1", "ORD-2", "ORD-3"] {
            provider.handle_push(&PushEvent::new_order(id, "New Order!", "")).await;
        }
        provider.logout().await;

        assert_eq!(provider.controller().phase(), AlertPhase::Idle);
        assert!(!provider.controller().is_playing().await);
        assert_eq!(speaker.entries(), vec!["begin ORD-1", "end"]);

        bridge.shutdown();
    }

    #[tokio::test]
    async fn simulate_dismiss_from_notice_then_next_order() {
        let (speaker, bridge, provider) = native_setup();
        let controller = provider.controller().clone();

        provider.handle_push(&PushEvent::new_order("ORD-1", "New Order!", "")).await;
        bridge.dismiss();

        // Orders stay pending while the alert is silent
        assert!(!controller.is_playing().await);
        assert_eq!(controller.phase(), AlertPhase::Desynced);
        assert_eq!(controller.active_orders(), vec!["ORD-1"]);

        provider.handle_push(&PushEvent::new_order("ORD-2", "New Order!", "")).await;
        assert!(controller.is_playing().await);
        assert_eq!(controller.phase(), AlertPhase::Active);
        assert_eq!(speaker.entries(), vec!["begin ORD-1", "end", "begin ORD-2"]);

        bridge.shutdown();
    }

    #[tokio::test]
    async fn simulate_browser_order_before_first_click() {
        let element = Rc::new(FakeAudioElement::default());
        let provider = AlertProvider::from_settings(
            &Settings::default(),
            &|| false,
            None,
            Some(element.clone()),
        );
        let controller = provider.controller().clone();
        let Some(web) = controller.backend().as_web().cloned() else {
            panic!("expected the web backend");
        };

        provider.handle_push(&PushEvent::new_order("ORD-1", "New Order!", "")).await;
        assert!(matches!(web.unlock_state(), UnlockState::PendingStart(_)));
        assert!(controller.is_playing().await);
        assert_eq!(element.audible_plays(), 0);

        // A scroll is not a qualifying gesture
        assert!(!web.handle_gesture("scroll").await);
        assert!(web.handle_gesture("click").await);
        assert_eq!(web.unlock_state(), UnlockState::Unlocked);
        assert_eq!(element.audible_plays(), 1);
        assert!(!web.is_listening());

        // Later gestures do nothing
        assert!(!web.handle_gesture("keydown").await);
        assert_eq!(element.audible_plays(), 1);

        provider.order_acted("ORD-1", OrderAction::Viewed).await;
        assert!(!controller.is_playing().await);
        assert_eq!(element.current_time.get(), 0.0);
    }

    #[tokio::test]
    async fn simulate_service_survives_failed_sound() {
        #[derive(Default)]
        struct BrokenSpeaker;

        impl AlarmPlayer for BrokenSpeaker {
            fn begin(&mut self, _request: &AlertRequest) -> Result<(), AlertError> {
                Err(AlertError::PlaybackRejected("no output device".to_string()))
            }

            fn end(&mut self) {}
        }

        let bridge = spawn_alert_service(BrokenSpeaker::default).unwrap();
        let provider = AlertProvider::from_settings(
            &Settings::default(),
            &|| true,
            Some(Rc::new(bridge.clone()) as Rc<dyn PlatformBridge>),
            None,
        );

        provider.handle_push(&PushEvent::new_order("ORD-1", "New Order!", "")).await;
        assert_eq!(provider.controller().phase(), AlertPhase::Desynced);
        assert!(provider.controller().is_active("ORD-1"));

        provider.order_acted("ORD-1", OrderAction::Rejected).await;
        assert_eq!(provider.controller().phase(), AlertPhase::Idle);

        bridge.shutdown();
    }
}
