use bevy::prelude::*;
use rand::Rng;

use crate::plugins::inventory::{Bag, Gold};
use crate::plugins::items::{spawn_item, ItemDatabase};
use crate::plugins::pool::ComponentPool;
use crate::plugins::stats::StatsComponent;

pub const SHOP_SIZE: usize = 5;

pub struct ShopPlugin;

impl Plugin for ShopPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<BuyItemEvent>()
            .add_systems(Update, buy_item_system);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopOffer {
    pub item_id: String,
    pub price: u32,
}

#[derive(Component, Debug, Default, Clone)]
pub struct ShopComponent {
    pub offers: Vec<ShopOffer>,
}

impl ShopComponent {
    pub fn stocked(item_db: &ItemDatabase, rng: &mut impl Rng) -> Self {
        Self {
            offers: generate_shop_offers(item_db, SHOP_SIZE, rng),
        }
    }
}

#[derive(Event, Debug, Clone, Copy)]
pub struct BuyItemEvent {
    pub buyer: Entity,
    pub shop: Entity,
    pub slot_index: usize,
}

pub fn generate_shop_offers(item_db: &ItemDatabase, count: usize, rng: &mut impl Rng) -> Vec<ShopOffer> {
    // sorted so a seeded rng stocks the same shelves every run
    let mut candidates: Vec<_> = item_db.items.values().collect();
    candidates.sort_by(|a, b| a.id.cmp(&b.id));

    let mut results = Vec::with_capacity(count);
    for _ in 0..count {
        let Some(choice) = pick_random(&candidates, &mut *rng) else { break };
        results.push(ShopOffer {
            item_id: choice.id.clone(),
            price: choice.price,
        });
    }
    results
}

pub fn pick_random<'a, T>(list: &'a [T], rng: &mut impl Rng) -> Option<&'a T> {
    if list.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..list.len());
    Some(&list[idx])
}

fn buy_item_system(
    mut commands: Commands,
    mut events: EventReader<BuyItemEvent>,
    item_db: Res<ItemDatabase>,
    mut pool: ResMut<ComponentPool<StatsComponent>>,
    mut q_shops: Query<&mut ShopComponent>,
    mut q_buyers: Query<(&mut Gold, &mut Bag)>,
) {
    for event in events.read() {
        let Ok(mut shop) = q_shops.get_mut(event.shop) else {
            warn!("Entity {:?} is not a shop", event.shop);
            continue;
        };
        let Some(offer) = shop.offers.get(event.slot_index).cloned() else {
            continue;
        };
        let Ok((mut gold, mut bag)) = q_buyers.get_mut(event.buyer) else {
            continue;
        };
        if gold.0 < offer.price {
            info!("Not enough gold for {} ({} < {})", offer.item_id, gold.0, offer.price);
            continue;
        }
        let Some(def) = item_db.get(&offer.item_id) else {
            error!("Shop offers unknown item {}", offer.item_id);
            continue;
        };

        gold.0 -= offer.price;
        let item = spawn_item(&mut commands, def, &mut pool);
        bag.items.push(item);
        shop.offers.remove(event.slot_index);
        info!("Bought {} for {} gold", def.name, offer.price);
    }
}
