//! The per-message resolution cascade and handler dispatch.
//!
//! One call handles one inbound message: context in, reply and mutated
//! context out. Nothing here persists state; the session runtime owns
//! loading and saving around each call. Collaborator failures degrade to
//! named fallback replies, so this function never fails the session.

use std::sync::Arc;

use shopmate_core::budget::parse_budget;
use shopmate_core::config::DialogueTuning;
use shopmate_core::escalation::{EscalationGateway, EscalationPolicy, EscalationResponse};
use shopmate_core::orders::OrderStore;
use shopmate_core::search::{detect_brands, ProductFinder, SearchIndex};
use shopmate_core::workflow::{canonical_reason, check_eligibility, is_affirmative, reasons_for};
use shopmate_core::{
    ConversationLog, OrderId, OrderRecord, Phase, ProductCache, ProductRecord, SessionContext,
    TransactionKind, WarrantyPolicy,
};

use crate::nlu::{rule_based, Entities, Intent, NluClient, NluOutcome};
use crate::render::{RenderFacts, ResponseRenderer};
use crate::reply::{
    base_buttons, context_buttons, main_menu_buttons, order_action_buttons, DisplayKind, Reply,
    TrackingView,
};

/// Literal reset commands, matched case-insensitively against the whole
/// message. The last two are the reserved localized synonyms.
const MAIN_MENU_COMMANDS: &[&str] = &["main menu", "menu", "home", "ホーム", "メインメニュー"];

const PURCHASE_KEYWORDS: &[&str] = &["laptop", "buy", "purchase", "computer"];

const COMPARISON_KEYWORDS: &[&str] =
    &["compare", "comparison", " vs ", "versus", "difference between"];

const COLOR_KEYWORDS: &[&str] =
    &["color", "colour", "blue", "red", "black", "silver", "gray", "white"];

const POLICY_KEYWORDS: &[&str] = &[
    "warranty policy",
    "warranty information",
    "warranty terms",
    "warranty coverage",
    "what is covered",
    "warranty details",
    "policy",
    "policies",
    "terms and conditions",
    "what is the warranty",
    "how does warranty work",
    "warranty period",
];

const CLAIM_KEYWORDS: &[&str] = &[
    "warranty claim",
    "file warranty",
    "make warranty",
    "request warranty",
    "warranty request",
    "need warranty",
    "want warranty",
];

/// Phrasings judged too unstructured for deterministic handling; they go
/// straight to the generic responder.
const COMPLEX_PATTERNS: &[&str] = &[
    "do you have",
    "when will",
    "how long",
    "what is",
    "tell me about",
    "explain",
    "help with",
    "how does",
    "why should",
    "pros and cons",
    "advantages and disadvantages",
];

pub struct RouterDeps {
    pub nlu: Arc<dyn NluClient>,
    pub search: Arc<dyn SearchIndex>,
    pub renderer: Arc<dyn ResponseRenderer>,
    pub escalation: Arc<dyn EscalationGateway>,
    pub orders: Arc<dyn OrderStore>,
    pub log: Arc<dyn ConversationLog>,
}

pub struct DialogueRouter {
    nlu: Arc<dyn NluClient>,
    finder: ProductFinder,
    renderer: Arc<dyn ResponseRenderer>,
    escalation_gateway: Arc<dyn EscalationGateway>,
    orders: Arc<dyn OrderStore>,
    log: Arc<dyn ConversationLog>,
    warranty_policy: WarrantyPolicy,
    escalation: EscalationPolicy,
    tuning: DialogueTuning,
}

impl DialogueRouter {
    pub fn new(deps: RouterDeps, tuning: DialogueTuning, warranty_policy: WarrantyPolicy) -> Self {
        Self {
            nlu: deps.nlu,
            finder: ProductFinder::new(deps.search, tuning.clone()),
            renderer: deps.renderer,
            escalation_gateway: deps.escalation,
            orders: deps.orders,
            log: deps.log,
            warranty_policy,
            escalation: EscalationPolicy::new(tuning.escalation_offer_turn),
            tuning,
        }
    }

    /// Resolution order, first match wins:
    /// main menu → pending escalation → escalation offer → warranty-policy
    /// question → explicit warranty claim → complex-message bypass → intent
    /// resolution → context-bleed cleanup → handler dispatch.
    pub async fn handle_message(&self, ctx: &mut SessionContext, message: &str) -> Reply {
        let trimmed = message.trim();
        let lowered = trimmed.to_lowercase();

        if MAIN_MENU_COMMANDS.contains(&lowered.as_str()) {
            ctx.reset();
            let mut reply = Reply::new(
                "Main Menu - How can I help you today?",
                Intent::GeneralQuestion,
                Entities::new(),
            )
            .with_buttons(main_menu_buttons());
            reply.intent = "main_menu".to_string();
            reply.reset_context = true;
            return reply;
        }

        ctx.turn_count += 1;

        if matches!(ctx.phase, Phase::EscalationOffered) {
            return self.handle_escalation_response(ctx, trimmed, &lowered).await;
        }

        if self.escalation.should_offer(ctx) {
            ctx.escalation_offered = true;
            ctx.phase = Phase::EscalationOffered;
            tracing::info!(
                event_name = "dialogue.escalation_offered",
                turn_count = ctx.turn_count,
                "offering human handoff"
            );
            let mut reply = Reply::new(
                "I've been helping you for a while. Would you like to speak with a human agent for more personalized assistance?",
                Intent::GeneralQuestion,
                Entities::new(),
            )
            .with_buttons(vec![
                "Yes, connect to agent".to_string(),
                "No, continue with chat".to_string(),
            ]);
            reply.intent = "escalation_offer".to_string();
            return reply;
        }

        self.route(ctx, trimmed, &lowered).await
    }

    async fn route(&self, ctx: &mut SessionContext, message: &str, lowered: &str) -> Reply {
        if is_warranty_policy_inquiry(lowered) {
            return self.show_warranty_policy(ctx, None, Entities::new()).await;
        }

        if CLAIM_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            ctx.clear_purchase();
            let order_id = OrderId::scan(message);
            return self
                .enter_transaction(ctx, TransactionKind::Warranty, order_id, Entities::new())
                .await;
        }

        if should_bypass(message, lowered) {
            return self.fallback(ctx, Intent::GeneralQuestion, Entities::new()).await;
        }

        let NluOutcome { intent, entities } = match rule_based(message) {
            Some(outcome) => outcome,
            None => match self.nlu.understand(message, ctx).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::warn!(
                        event_name = "dialogue.nlu_degraded",
                        error = %error,
                        "nlu oracle failed; treating as general question"
                    );
                    NluOutcome::general()
                }
            },
        };

        // Context-bleed cleanup: a stale product list must not leak into
        // unrelated replies.
        if intent == Intent::OrderStatus && ctx.in_purchase_flow {
            ctx.clear_purchase();
        }
        if !intent.is_product_related() && !has_purchase_keyword(lowered) {
            ctx.clear_purchase();
        }

        self.dispatch(ctx, message, lowered, intent, entities).await
    }

    async fn dispatch(
        &self,
        ctx: &mut SessionContext,
        message: &str,
        lowered: &str,
        intent: Intent,
        entities: Entities,
    ) -> Reply {
        let padded = format!(" {lowered} ");
        if COMPARISON_KEYWORDS.iter().any(|k| padded.contains(k)) {
            return self.handle_comparison(ctx, message, intent, entities).await;
        }

        if COLOR_KEYWORDS.iter().any(|k| lowered.contains(k)) && !ctx.cached_products().is_empty()
        {
            return self.handle_color_inquiry(ctx, lowered, intent, entities).await;
        }

        if intent == Intent::ProductInquiry
            || has_purchase_keyword(lowered)
            || ctx.in_purchase_flow
        {
            return self.handle_purchase(ctx, message, intent, entities).await;
        }

        match ctx.phase.clone() {
            Phase::AwaitingConfirmation { kind, order, reason } => {
                return self.handle_confirmation(ctx, lowered, kind, order, reason).await;
            }
            Phase::AwaitingReason { kind, order } => {
                return self.handle_reason(ctx, message, kind, order, entities).await;
            }
            Phase::AwaitingOrderId { kind } => {
                return self.handle_order_id_response(ctx, message, kind, entities).await;
            }
            Phase::AwaitingWarrantyPolicyAck { order } => {
                return self.handle_warranty_ack(ctx, lowered, order).await;
            }
            Phase::Idle | Phase::EscalationOffered => {}
        }

        if let Some(kind) = transaction_kind_for(intent) {
            let order_id = entity_order_id(&entities).or_else(|| OrderId::scan(message));
            return self.enter_transaction(ctx, kind, order_id, entities).await;
        }

        if intent == Intent::OrderStatus {
            return self.handle_order_status(ctx, message, lowered, entities).await;
        }

        self.fallback(ctx, intent, entities).await
    }

    // ---- escalation -----------------------------------------------------

    async fn handle_escalation_response(
        &self,
        ctx: &mut SessionContext,
        message: &str,
        lowered: &str,
    ) -> Reply {
        ctx.phase = Phase::Idle;

        match self.escalation.classify_response(message) {
            EscalationResponse::Accepted => {
                let transcript =
                    self.log.recent(&ctx.user.user_id, 10).await.unwrap_or_default();
                let outcome = self.escalation_gateway.escalate(&ctx.user, &transcript).await;

                match outcome {
                    Ok(result) if result.success => {
                        ctx.escalated = true;
                        tracing::info!(
                            event_name = "dialogue.escalated",
                            user_id = %ctx.user.user_id,
                            "handoff to human agent succeeded"
                        );
                        let mut reply = Reply::new(
                            "I'm connecting you with a human agent. Please wait while we transfer the conversation. An agent will be with you shortly.",
                            Intent::GeneralQuestion,
                            Entities::new(),
                        )
                        .with_buttons(vec!["Main Menu".to_string()]);
                        reply.intent = "escalation_success".to_string();
                        reply.escalated = true;
                        reply
                    }
                    Ok(_) | Err(_) => {
                        let mut reply = Reply::new(
                            "I'm sorry, all of our agents are currently busy. Please try again in a few minutes or continue chatting with me.",
                            Intent::GeneralQuestion,
                            Entities::new(),
                        )
                        .with_buttons(vec!["Main Menu".to_string(), "Continue Chat".to_string()]);
                        reply.intent = "escalation_failed".to_string();
                        reply
                    }
                }
            }
            EscalationResponse::Declined => {
                // Resume normal routing for this same message; the offer is
                // never repeated this session.
                self.route(ctx, message, lowered).await
            }
        }
    }

    // ---- warranty policy ------------------------------------------------

    async fn show_warranty_policy(
        &self,
        ctx: &mut SessionContext,
        order: Option<OrderRecord>,
        entities: Entities,
    ) -> Reply {
        ctx.phase = Phase::AwaitingWarrantyPolicyAck { order };

        let mut text = self.warranty_policy.render_text();
        text.push_str("\nWould you like to proceed with your warranty claim?");

        let mut reply = Reply::new(text, Intent::WarrantyClaim, entities)
            .with_buttons(vec!["Yes, proceed".to_string(), "No, cancel".to_string()])
            .with_display(DisplayKind::PolicyView);
        reply.intent = "warranty_policy".to_string();
        reply
    }

    async fn handle_warranty_ack(
        &self,
        ctx: &mut SessionContext,
        lowered: &str,
        order: Option<OrderRecord>,
    ) -> Reply {
        if is_affirmative(lowered) {
            match order {
                Some(order) => self.ask_reason(ctx, TransactionKind::Warranty, order).await,
                None => {
                    ctx.phase = Phase::AwaitingOrderId { kind: TransactionKind::Warranty };
                    let text = self
                        .render(&RenderFacts::AskOrderId { kind: TransactionKind::Warranty })
                        .await;
                    Reply::new(text, Intent::WarrantyClaim, Entities::new())
                        .with_buttons(base_buttons())
                }
            }
        } else {
            ctx.clear_transaction();
            let text = self
                .render(&RenderFacts::TransactionCancelled { kind: TransactionKind::Warranty })
                .await;
            Reply::new(text, Intent::WarrantyClaim, Entities::new()).with_buttons(base_buttons())
        }
    }

    // ---- transactions ---------------------------------------------------

    async fn enter_transaction(
        &self,
        ctx: &mut SessionContext,
        kind: TransactionKind,
        order_id: Option<OrderId>,
        entities: Entities,
    ) -> Reply {
        let Some(order_id) = order_id else {
            ctx.phase = Phase::AwaitingOrderId { kind };
            let text = self.render(&RenderFacts::AskOrderId { kind }).await;
            return Reply::new(text, intent_for(kind), entities).with_buttons(base_buttons());
        };

        match self.orders.order_by_id(&order_id).await {
            Ok(Some(order)) => self.proceed_with_order(ctx, kind, order, entities).await,
            Ok(None) => {
                let text =
                    self.render(&RenderFacts::OrderNotFound { order_id: order_id.0 }).await;
                Reply::new(text, intent_for(kind), entities).with_buttons(base_buttons())
            }
            Err(error) => self.order_store_degraded(kind, &error, entities).await,
        }
    }

    async fn handle_order_id_response(
        &self,
        ctx: &mut SessionContext,
        message: &str,
        kind: TransactionKind,
        entities: Entities,
    ) -> Reply {
        let Some(order_id) = entity_order_id(&entities).or_else(|| OrderId::scan(message)) else {
            // Clarifying follow-up; the phase does not advance.
            return Reply::new(
                "I couldn't find an Order ID in your message. Please provide your Order ID (e.g., ORD-1234).",
                intent_for(kind),
                entities,
            )
            .with_buttons(base_buttons());
        };

        match self.orders.order_by_id(&order_id).await {
            Ok(Some(order)) => self.proceed_with_order(ctx, kind, order, entities).await,
            Ok(None) => {
                let text =
                    self.render(&RenderFacts::OrderNotFound { order_id: order_id.0 }).await;
                Reply::new(text, intent_for(kind), entities).with_buttons(base_buttons())
            }
            Err(error) => self.order_store_degraded(kind, &error, entities).await,
        }
    }

    /// The eligibility step: gate by order status, then branch into the
    /// warranty policy ack or straight to the reason step.
    async fn proceed_with_order(
        &self,
        ctx: &mut SessionContext,
        kind: TransactionKind,
        order: OrderRecord,
        entities: Entities,
    ) -> Reply {
        if let Err(error) = check_eligibility(kind, &order) {
            ctx.clear_transaction();
            tracing::info!(
                event_name = "dialogue.transaction_ineligible",
                order_id = %order.order_id,
                status = %order.status,
                "transaction rejected by status gate"
            );
            return ineligible_reply(kind, &order, entities, error.to_string());
        }

        match kind {
            TransactionKind::Warranty => {
                self.show_warranty_policy(ctx, Some(order), entities).await
            }
            _ => {
                let summary = self.render(&RenderFacts::OrderSummary { order: order.clone() }).await;
                let reply = self.ask_reason(ctx, kind, order.clone()).await;
                let text = format!("{summary}\n\n{}", reply.response);
                Reply { response: text, ..reply }.with_orders(vec![order])
            }
        }
    }

    async fn ask_reason(
        &self,
        ctx: &mut SessionContext,
        kind: TransactionKind,
        order: OrderRecord,
    ) -> Reply {
        ctx.phase = Phase::AwaitingReason { kind, order };
        let reasons: Vec<String> = reasons_for(kind).iter().map(|r| r.to_string()).collect();
        let text = self.render(&RenderFacts::AskReason { kind, reasons: reasons.clone() }).await;
        Reply::new(text, intent_for(kind), Entities::new()).with_buttons(reasons)
    }

    async fn handle_reason(
        &self,
        ctx: &mut SessionContext,
        message: &str,
        kind: TransactionKind,
        order: OrderRecord,
        entities: Entities,
    ) -> Reply {
        let raw = entities.get("reason").map(String::as_str).unwrap_or(message);
        let reason = canonical_reason(kind, raw);

        ctx.phase = Phase::AwaitingConfirmation { kind, order: order.clone(), reason: reason.clone() };

        let text = self
            .render(&RenderFacts::ConfirmTransaction { kind, order, reason })
            .await;
        Reply::new(text, intent_for(kind), entities)
            .with_buttons(vec!["Yes, confirm".to_string(), "No, cancel".to_string()])
    }

    async fn handle_confirmation(
        &self,
        ctx: &mut SessionContext,
        lowered: &str,
        kind: TransactionKind,
        order: OrderRecord,
        reason: String,
    ) -> Reply {
        if !is_affirmative(lowered) {
            // Any non-affirmative answer abandons the transaction entirely;
            // a later "yes" has nothing left to commit.
            ctx.clear_transaction();
            let text = self.render(&RenderFacts::TransactionCancelled { kind }).await;
            return Reply::new(text, intent_for(kind), Entities::new())
                .with_buttons(base_buttons());
        }

        match self.orders.commit(kind, &ctx.user, &order, &reason).await {
            Ok(transaction_id) => {
                ctx.clear_transaction();
                tracing::info!(
                    event_name = "dialogue.transaction_committed",
                    transaction_id = %transaction_id,
                    order_id = %order.order_id,
                    kind = kind.noun(),
                    "transaction committed"
                );
                let text = self
                    .render(&RenderFacts::Committed { kind, order, transaction_id })
                    .await;
                let mut buttons = base_buttons();
                buttons.push("Main Menu".to_string());
                Reply::new(text, intent_for(kind), Entities::new()).with_buttons(buttons)
            }
            Err(error) => {
                // Keep the confirmation pending; the user can simply say
                // "yes" again once the store is reachable.
                tracing::warn!(
                    event_name = "dialogue.commit_degraded",
                    error = %error,
                    "order store rejected commit"
                );
                Reply::new(
                    format!(
                        "I couldn't record your {} just now. Please try again in a moment.",
                        kind.noun()
                    ),
                    intent_for(kind),
                    Entities::new(),
                )
                .with_buttons(vec!["Yes, confirm".to_string(), "No, cancel".to_string()])
            }
        }
    }

    // ---- purchase flow --------------------------------------------------

    async fn handle_purchase(
        &self,
        ctx: &mut SessionContext,
        message: &str,
        intent: Intent,
        entities: Entities,
    ) -> Reply {
        ctx.in_purchase_flow = true;

        let query = build_search_query(message);
        let budget_text =
            entities.get("max_price").or_else(|| entities.get("budget")).cloned();
        let constraint = budget_text.as_deref().and_then(|text| {
            parse_budget(text, self.tuning.yen_to_inr_rate, self.tuning.around_band)
        });

        let outcome = self.finder.find(&query, constraint.as_ref()).await;

        if outcome.products.is_empty() {
            ctx.product_cache = None;
            return no_products_reply(&query, intent, entities);
        }

        ctx.product_cache = Some(ProductCache {
            products: outcome.products.clone(),
            last_search_query: query.clone(),
        });

        tracing::debug!(
            event_name = "dialogue.products_recommended",
            query = %query,
            shown = outcome.products.len(),
            total = outcome.total_matches,
            "recommendation computed"
        );

        let text = self
            .render(&RenderFacts::ProductList {
                products: outcome.products.clone(),
                query: query.clone(),
            })
            .await;

        let mut buttons = context_buttons(&query, &outcome.products);
        buttons.push("Main Menu".to_string());

        Reply::new(text, intent, entities)
            .with_buttons(buttons)
            .with_products(outcome.products)
    }

    // ---- comparison and colors ------------------------------------------

    async fn handle_comparison(
        &self,
        _ctx: &mut SessionContext,
        message: &str,
        intent: Intent,
        entities: Entities,
    ) -> Reply {
        let mentions = detect_brands(message);
        if mentions.len() < 2 {
            return Reply::new(
                "I need at least two products to compare. Please specify which models you'd like to compare.",
                intent,
                entities,
            )
            .with_buttons(base_buttons());
        }

        let mut products: Vec<ProductRecord> = Vec::new();
        for mention in &mentions {
            if let Some(product) =
                self.finder.first_match(mention, self.tuning.comparison_match_floor).await
            {
                if !products.iter().any(|p| p.id == product.id) {
                    products.push(product);
                }
            }
        }

        if products.len() < 2 {
            return Reply::new(
                "I couldn't find enough matching products to compare. Please be more specific about the models.",
                intent,
                entities,
            )
            .with_buttons(base_buttons());
        }

        let text = self.render(&RenderFacts::Comparison { products: products.clone() }).await;
        Reply::new(text, Intent::ProductComparison, entities)
            .with_buttons(vec![
                "Main Menu".to_string(),
                "Purchase Laptop".to_string(),
                "More Details".to_string(),
            ])
            .with_products(products)
            .with_display(DisplayKind::ComparisonView)
    }

    async fn handle_color_inquiry(
        &self,
        ctx: &mut SessionContext,
        _lowered: &str,
        intent: Intent,
        entities: Entities,
    ) -> Reply {
        let cached = ctx.cached_products().to_vec();
        let with_colors: Vec<ProductRecord> =
            cached.iter().filter(|p| p.has_color_info()).cloned().collect();

        let facts = if with_colors.is_empty() {
            RenderFacts::ColorUnavailable { products: cached.clone() }
        } else {
            RenderFacts::ColorAvailability { products: with_colors }
        };
        let text = self.render(&facts).await;

        let query = ctx
            .product_cache
            .as_ref()
            .map(|cache| cache.last_search_query.clone())
            .unwrap_or_default();
        let mut buttons = context_buttons(&query, &cached);
        buttons.push("Main Menu".to_string());

        Reply::new(text, intent, entities).with_buttons(buttons).with_products(cached)
    }

    // ---- order status ---------------------------------------------------

    async fn handle_order_status(
        &self,
        ctx: &mut SessionContext,
        message: &str,
        lowered: &str,
        entities: Entities,
    ) -> Reply {
        // Quick-reply actions carry the order id inline ("Return ORD-1001").
        if let Some(order_id) = entity_order_id(&entities).or_else(|| OrderId::scan(message)) {
            if lowered.contains("track") {
                return self.handle_tracking(order_id, entities).await;
            }
            for (keyword, kind) in [
                ("warranty", TransactionKind::Warranty),
                ("cancel", TransactionKind::Cancellation),
                ("return", TransactionKind::Return),
            ] {
                if lowered.contains(keyword) {
                    return self.enter_transaction(ctx, kind, Some(order_id), entities).await;
                }
            }

            return match self.orders.order_by_id(&order_id).await {
                Ok(Some(order)) => {
                    let text =
                        self.render(&RenderFacts::OrderSummary { order: order.clone() }).await;
                    Reply::new(text, Intent::OrderStatus, entities)
                        .with_buttons(order_action_buttons(&order))
                        .with_orders(vec![order])
                }
                Ok(None) => {
                    let text =
                        self.render(&RenderFacts::OrderNotFound { order_id: order_id.0 }).await;
                    Reply::new(text, Intent::OrderStatus, entities).with_buttons(base_buttons())
                }
                Err(error) => self.order_store_degraded_status(&error, entities).await,
            };
        }

        match self.orders.orders_for_customer(&ctx.user.customer_id, 10).await {
            Ok(orders) if !orders.is_empty() => {
                let text = self.render(&RenderFacts::OrderList { count: orders.len() }).await;
                Reply::new(text, Intent::OrderStatus, entities)
                    .with_buttons(vec!["Main Menu".to_string()])
                    .with_orders(orders)
            }
            Ok(_) => Reply::new(
                "I couldn't find any orders for your account. Would you like to check with a specific Order ID?",
                Intent::OrderStatus,
                entities,
            )
            .with_buttons(base_buttons()),
            Err(error) => self.order_store_degraded_status(&error, entities).await,
        }
    }

    async fn handle_tracking(&self, order_id: OrderId, entities: Entities) -> Reply {
        match self.orders.order_by_id(&order_id).await {
            Ok(Some(order)) => {
                let text = self.render(&RenderFacts::Tracking { order: order.clone() }).await;
                let mut reply = Reply::new(text, Intent::OrderStatus, entities)
                    .with_buttons(vec![
                        "Order Status".to_string(),
                        "Main Menu".to_string(),
                        "Contact Support".to_string(),
                    ])
                    .with_tracking(TrackingView::from_order(&order));
                reply.intent = "order_tracking".to_string();
                reply
            }
            Ok(None) => {
                let text =
                    self.render(&RenderFacts::OrderNotFound { order_id: order_id.0 }).await;
                Reply::new(text, Intent::OrderStatus, entities).with_buttons(base_buttons())
            }
            Err(error) => self.order_store_degraded_status(&error, entities).await,
        }
    }

    // ---- fallback -------------------------------------------------------

    async fn fallback(&self, ctx: &mut SessionContext, intent: Intent, entities: Entities) -> Reply {
        let text = self
            .render(&RenderFacts::General {
                intent,
                user_name: ctx.user.display_name().to_string(),
            })
            .await;

        let mut buttons = base_buttons();
        match intent {
            Intent::ProductInquiry => {
                buttons.extend(["Gaming", "Business", "Student", "Budget"].map(String::from));
            }
            Intent::OrderStatus => {
                buttons.extend(["Track Another", "Help"].map(String::from));
            }
            Intent::ReturnRequest | Intent::CancellationRequest => {
                buttons.extend(["Confirm", "Help"].map(String::from));
            }
            _ => {}
        }
        buttons.push("Main Menu".to_string());

        Reply::new(text, intent, entities).with_buttons(buttons)
    }

    // ---- helpers --------------------------------------------------------

    async fn render(&self, facts: &RenderFacts) -> String {
        match self.renderer.render(facts).await {
            Ok(text) => text,
            Err(error) => {
                tracing::debug!(
                    event_name = "dialogue.render_degraded",
                    error = %error,
                    "renderer failed; using deterministic template"
                );
                facts.fallback_text()
            }
        }
    }

    async fn order_store_degraded(
        &self,
        kind: TransactionKind,
        error: &shopmate_core::OrderStoreError,
        entities: Entities,
    ) -> Reply {
        tracing::warn!(
            event_name = "dialogue.order_store_degraded",
            error = %error,
            "order store unavailable"
        );
        Reply::new(
            format!(
                "I couldn't look up your order just now. Please try your {} again in a moment.",
                kind.noun()
            ),
            intent_for(kind),
            entities,
        )
        .with_buttons(base_buttons())
    }

    async fn order_store_degraded_status(
        &self,
        error: &shopmate_core::OrderStoreError,
        entities: Entities,
    ) -> Reply {
        tracing::warn!(
            event_name = "dialogue.order_store_degraded",
            error = %error,
            "order store unavailable"
        );
        Reply::new(
            "I couldn't reach the order system just now. Please try again shortly.",
            Intent::OrderStatus,
            entities,
        )
        .with_buttons(base_buttons())
    }
}

// ---- free functions ------------------------------------------------------

fn has_purchase_keyword(lowered: &str) -> bool {
    PURCHASE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Policy question, not a claim: policy keywords present and claim keywords
/// absent.
fn is_warranty_policy_inquiry(lowered: &str) -> bool {
    let has_policy = POLICY_KEYWORDS.iter().any(|k| lowered.contains(k));
    let has_claim = CLAIM_KEYWORDS.iter().any(|k| lowered.contains(k));
    has_policy && !has_claim
}

fn should_bypass(message: &str, lowered: &str) -> bool {
    message.contains('\n') || COMPLEX_PATTERNS.iter().any(|p| lowered.contains(p))
}

fn transaction_kind_for(intent: Intent) -> Option<TransactionKind> {
    match intent {
        Intent::CancellationRequest => Some(TransactionKind::Cancellation),
        Intent::ReturnRequest => Some(TransactionKind::Return),
        Intent::WarrantyClaim => Some(TransactionKind::Warranty),
        _ => None,
    }
}

fn intent_for(kind: TransactionKind) -> Intent {
    match kind {
        TransactionKind::Cancellation => Intent::CancellationRequest,
        TransactionKind::Return => Intent::ReturnRequest,
        TransactionKind::Warranty => Intent::WarrantyClaim,
    }
}

fn entity_order_id(entities: &Entities) -> Option<OrderId> {
    entities.get("order_id").and_then(|raw| OrderId::scan(raw))
}

/// Strips filler and currency words down to the searchable keywords.
fn build_search_query(message: &str) -> String {
    const FILLER: &[&str] = &[
        "i", "want", "a", "an", "the", "need", "with", "for", "under", "over", "around", "about",
        "me", "show", "please", "some", "laptop", "laptops", "color", "colour", "¥", "yen", "円",
    ];

    let words: Vec<&str> = message
        .split_whitespace()
        .filter(|word| {
            let cleaned = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            !cleaned.is_empty()
                && !FILLER.contains(&cleaned.as_str())
                && !cleaned.chars().all(|c| c.is_ascii_digit())
        })
        .collect();

    if words.is_empty() {
        "laptop".to_string()
    } else {
        words.join(" ")
    }
}

/// No products survived filtering: keep the conversation moving with
/// query-category suggestions instead of a dead end.
fn no_products_reply(query: &str, intent: Intent, entities: Entities) -> Reply {
    let lowered = query.to_lowercase();

    let (text, extra): (&str, &[&str]) = if ["gaming", "game", "gamer"]
        .iter()
        .any(|w| lowered.contains(w))
    {
        (
            "Looking for a gaming laptop? Could you share your budget range and any must-have features, like the graphics card or screen size?",
            &["Under ¥80000", "Under ¥120000", "RTX Graphics", "16GB RAM"],
        )
    } else if ["business", "work", "office"].iter().any(|w| lowered.contains(w)) {
        (
            "For business use I'd suggest reliable brands with good battery life. What's your budget, and do you need a lightweight design?",
            &["Under ¥60000", "Lightweight", "Long Battery"],
        )
    } else if ["student", "school", "college"].iter().any(|w| lowered.contains(w)) {
        (
            "Student laptops offer great value. What's your budget range?",
            &["Under ¥50000", "Under ¥40000", "Portable"],
        )
    } else if ["budget", "cheap", "affordable", "price"].iter().any(|w| lowered.contains(w)) {
        (
            "Happy to find you a good-value laptop. What's your maximum budget, and what will you mainly use it for?",
            &["Under ¥40000", "Under ¥50000", "Basic Use"],
        )
    } else {
        (
            "I couldn't find matching laptops for that. Could you tell me more about what you're looking for? A budget range, preferred brand, or intended use all help.",
            &["Gaming", "Business", "Student", "Under ¥50000"],
        )
    };

    let mut buttons: Vec<String> = extra.iter().map(|b| b.to_string()).collect();
    buttons.push("Main Menu".to_string());

    Reply::new(text, intent, entities).with_buttons(buttons)
}

fn ineligible_reply(
    kind: TransactionKind,
    order: &OrderRecord,
    entities: Entities,
    log_line: String,
) -> Reply {
    let (text, buttons) = match kind {
        TransactionKind::Cancellation => (
            "This order has already been delivered. Cancellation is not possible for delivered orders. Would you like to initiate a return instead?".to_string(),
            vec!["Return".to_string(), "Main Menu".to_string()],
        ),
        TransactionKind::Return => (
            format!(
                "This order has status: {}. Returns are only possible for delivered items.",
                order.status
            ),
            base_buttons(),
        ),
        TransactionKind::Warranty => (
            format!(
                "This order has status: {}. Warranty claims are only possible for delivered items.",
                order.status
            ),
            base_buttons(),
        ),
    };

    tracing::debug!(event_name = "dialogue.eligibility_message", detail = %log_line);
    Reply::new(text, intent_for(kind), entities).with_buttons(buttons)
}

#[cfg(test)]
mod tests {
    use super::{build_search_query, is_warranty_policy_inquiry, should_bypass};

    #[test]
    fn policy_questions_are_not_claims() {
        assert!(is_warranty_policy_inquiry("what is the warranty policy?"));
        assert!(is_warranty_policy_inquiry("how does warranty work"));
        assert!(!is_warranty_policy_inquiry("i want to file warranty claim"));
        assert!(!is_warranty_policy_inquiry("where is my order"));
    }

    #[test]
    fn multiline_and_complex_messages_bypass_structured_handling() {
        assert!(should_bypass("line one\nline two", "line one\nline two"));
        assert!(should_bypass("tell me about macbooks", "tell me about macbooks"));
        assert!(!should_bypass("hp under 50k", "hp under 50k"));
    }

    #[test]
    fn search_query_drops_filler_and_numbers() {
        assert_eq!(build_search_query("I want a HP laptop with AMD Ryzen for 50000"), "HP AMD Ryzen");
        assert_eq!(build_search_query("show me a laptop please"), "laptop");
        assert_eq!(build_search_query("gaming laptop for students"), "gaming students");
    }
}
