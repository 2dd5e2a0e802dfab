use bevy::prelude::*;
use crypt_crawler::plugins::inventory::{Bag, Gold, InventoryPlugin};
use crypt_crawler::plugins::items::{ItemComponent, ItemsPlugin};
use crypt_crawler::plugins::shop::{BuyItemEvent, ShopComponent, ShopOffer, ShopPlugin};
use crypt_crawler::plugins::stats::{StatsComponent, StatsPlugin, StatsType};

fn setup() -> (App, Entity, Entity) {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins((StatsPlugin, ItemsPlugin, InventoryPlugin, ShopPlugin));

    let shop = app
        .world_mut()
        .spawn(ShopComponent {
            offers: vec![
                ShopOffer { item_id: "health_potion".to_string(), price: 4 },
                ShopOffer { item_id: "iron_sword".to_string(), price: 12 },
            ],
        })
        .id();
    let buyer = app.world_mut().spawn((Gold(10), Bag::default())).id();
    (app, shop, buyer)
}

#[test]
fn test_buying_spawns_item_into_bag() {
    let (mut app, shop, buyer) = setup();

    app.world_mut().send_event(BuyItemEvent { buyer, shop, slot_index: 0 });
    app.update();

    let world = app.world();
    assert_eq!(world.get::<Gold>(buyer), Some(&Gold(6)));
    let bag = world.get::<Bag>(buyer).unwrap();
    assert_eq!(bag.items.len(), 1);

    let item = bag.items[0];
    assert_eq!(world.get::<ItemComponent>(item).unwrap().id, "health_potion");
    assert_eq!(world.get::<StatsComponent>(item).unwrap().get(StatsType::Life), 15.0);

    let offers = &world.get::<ShopComponent>(shop).unwrap().offers;
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].item_id, "iron_sword");
}

#[test]
fn test_insufficient_gold_is_ignored() {
    let (mut app, shop, buyer) = setup();

    app.world_mut().send_event(BuyItemEvent { buyer, shop, slot_index: 1 });
    app.update();

    let world = app.world();
    assert_eq!(world.get::<Gold>(buyer), Some(&Gold(10)));
    assert!(world.get::<Bag>(buyer).unwrap().items.is_empty());
    assert_eq!(world.get::<ShopComponent>(shop).unwrap().offers.len(), 2);
}

#[test]
fn test_invalid_slot_is_ignored() {
    let (mut app, shop, buyer) = setup();

    app.world_mut().send_event(BuyItemEvent { buyer, shop, slot_index: 9 });
    app.update();

    assert_eq!(app.world().get::<Gold>(buyer), Some(&Gold(10)));
}
