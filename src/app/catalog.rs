//! Builtin flow catalog and access rules.
//!
//! The product's flows and gating are startup data, declared here once.
//! Default-value backfill (disclaimers, caveats) is declarative: the schema
//! carries the default and the normalizer applies it, so no flow patches its
//! own output. Flow and field identifiers keep the upstream camelCase JSON
//! contract the model is prompted with.

use crate::domain::{
    AccessRule, FieldSchema, FlowDefinition, FlowError, FlowRegistry, ModelConfig, Schema, Tier,
    TierGate,
};

/// Per-coin trading signal. Pro and Premium.
pub const COIN_TRADING_SIGNAL: &str = "getCoinTradingSignal";
/// Daily featured signal. All tiers.
pub const SIGNAL_OF_THE_DAY: &str = "getSignalOfTheDay";
/// Portfolio roast. Premium only.
pub const PORTFOLIO_ROAST: &str = "getPortfolioRoast";

/// Disclaimer backfilled whenever the model omits one.
pub const DEFAULT_DISCLAIMER: &str =
    "Not financial advice. Crypto is extremely volatile; never risk money you cannot afford to lose.";

const COIN_TRADING_SIGNAL_PROMPT: &str = "\
You are MoonSignal, a hype-aware crypto analyst.
Produce a trading signal for {{ coinName }}.
Respond with a JSON object containing:
- recommendation: one of Buy, Sell, Hold, HODL
- reasoning: two or three sentences on momentum, community, and risk
- rocketScore: integer 1-5, where 5 is maximum moon potential
- disclaimer: one sentence reminding the reader this is entertainment
";

const SIGNAL_OF_THE_DAY_PROMPT: &str = "\
You are MoonSignal, a hype-aware crypto analyst.
Pick one coin as today's featured signal and make the case for watching it.
Respond with a JSON object containing:
- coinName: the featured coin
- thesis: a short paragraph on why today
- confidence: number 0-100
- disclaimer: one sentence reminding the reader this is entertainment
";

const PORTFOLIO_ROAST_PROMPT: &str = "\
You are MoonSignal, a brutally honest crypto comedian.
Roast this portfolio:
{% for holding in holdings %}- {{ holding.coinName }}: {{ holding.allocationPct }}%
{% endfor %}
Respond with a JSON object containing:
- roast: a paragraph of affectionate mockery
- riskCall: one of Degenerate, Risky, Balanced, Sleepy
- caveat: one sentence of genuine risk advice
";

fn coin_trading_signal() -> FlowDefinition {
    let mut input = Schema::new();
    input.insert(
        "coinName".into(),
        FieldSchema::string().describe("Coin the caller wants a signal for."),
    );

    let mut output = Schema::new();
    output.insert("recommendation".into(), FieldSchema::one_of(["Buy", "Sell", "Hold", "HODL"]));
    output.insert("reasoning".into(), FieldSchema::string());
    output.insert(
        "rocketScore".into(),
        FieldSchema::integer_between(1, 5).describe("Moon potential, 5 is highest."),
    );
    output.insert("disclaimer".into(), FieldSchema::string().with_default(DEFAULT_DISCLAIMER));

    FlowDefinition::new(COIN_TRADING_SIGNAL, input, output, COIN_TRADING_SIGNAL_PROMPT)
        .with_model_config(ModelConfig::with_temperature(0.7))
}

fn signal_of_the_day() -> FlowDefinition {
    let mut output = Schema::new();
    output.insert("coinName".into(), FieldSchema::string());
    output.insert("thesis".into(), FieldSchema::string());
    output.insert(
        "confidence".into(),
        FieldSchema::number_between(0.0, 100.0).describe("Conviction, 100 is certain."),
    );
    output.insert("generatedAt".into(), FieldSchema::timestamp());
    output.insert("disclaimer".into(), FieldSchema::string().with_default(DEFAULT_DISCLAIMER));

    FlowDefinition::new(SIGNAL_OF_THE_DAY, Schema::new(), output, SIGNAL_OF_THE_DAY_PROMPT)
        .with_model_config(ModelConfig::with_temperature(0.9))
}

fn portfolio_roast() -> FlowDefinition {
    let mut holding = Schema::new();
    holding.insert("coinName".into(), FieldSchema::string());
    holding.insert("allocationPct".into(), FieldSchema::number_between(0.0, 100.0));

    let mut input = Schema::new();
    input.insert("holdings".into(), FieldSchema::array_of(FieldSchema::object(holding)));

    let mut output = Schema::new();
    output.insert("roast".into(), FieldSchema::string());
    output.insert(
        "riskCall".into(),
        FieldSchema::one_of(["Degenerate", "Risky", "Balanced", "Sleepy"]),
    );
    output.insert("caveat".into(), FieldSchema::string().with_default(DEFAULT_DISCLAIMER));

    FlowDefinition::new(PORTFOLIO_ROAST, input, output, PORTFOLIO_ROAST_PROMPT)
        .with_model_config(ModelConfig::with_temperature(1.0))
}

/// All builtin feature identifiers.
pub fn builtin_features() -> [&'static str; 3] {
    [COIN_TRADING_SIGNAL, SIGNAL_OF_THE_DAY, PORTFOLIO_ROAST]
}

/// Registry holding every builtin flow.
pub fn builtin_registry() -> Result<FlowRegistry, FlowError> {
    let mut registry = FlowRegistry::new();
    registry.register(coin_trading_signal())?;
    registry.register(signal_of_the_day())?;
    registry.register(portfolio_roast())?;
    Ok(registry)
}

/// Access rules for the builtin flows, wired and verified.
pub fn builtin_gate() -> Result<TierGate, FlowError> {
    let gate = TierGate::new([
        AccessRule::new(SIGNAL_OF_THE_DAY, Tier::ALL),
        AccessRule::new(COIN_TRADING_SIGNAL, [Tier::Pro, Tier::Premium]),
        AccessRule::new(PORTFOLIO_ROAST, [Tier::Premium]),
    ]);
    gate.verify_features(builtin_features())?;
    Ok(gate)
}
